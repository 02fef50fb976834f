//! Authentication inputs: sign-in credentials and sign-up requests.
//!
//! Raw form values are validated here, before the session store talks to
//! the provider. Passwords are held in zeroizing buffers.

use std::fmt;

use zeroize::Zeroizing;

use super::{Username, UsernameValidationError};

/// Default minimum password length for new accounts.
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 6;

/// Domain error returned when authentication form values are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthValidationError {
    /// E-mail was missing or blank once trimmed.
    EmptyEmail,
    /// Password was blank.
    EmptyPassword,
    /// Password shorter than the configured minimum.
    PasswordTooShort { min: usize },
    /// Password and confirmation differ.
    PasswordMismatch,
    /// Requested username is malformed.
    Username(UsernameValidationError),
}

impl AuthValidationError {
    /// Name of the offending field.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyEmail => "email",
            Self::EmptyPassword | Self::PasswordTooShort { .. } => "password",
            Self::PasswordMismatch => "confirm_password",
            Self::Username(_) => "username",
        }
    }

    /// Machine-readable rejection code.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::EmptyEmail | Self::EmptyPassword => "empty",
            Self::PasswordTooShort { .. } => "too_short",
            Self::PasswordMismatch => "mismatch",
            Self::Username(err) => err.reason(),
        }
    }
}

impl fmt::Display for AuthValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
            Self::PasswordTooShort { min } => {
                write!(f, "password must be at least {min} characters")
            }
            Self::PasswordMismatch => write!(f, "passwords do not match"),
            Self::Username(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for AuthValidationError {}

fn normalise_email(email: &str) -> Result<String, AuthValidationError> {
    let normalized = email.trim();
    if normalized.is_empty() {
        return Err(AuthValidationError::EmptyEmail);
    }
    Ok(normalized.to_owned())
}

/// Validated sign-in credentials.
///
/// ## Invariants
/// - `email` is trimmed and must not be empty after trimming.
/// - `password` must be non-empty but keeps caller-provided whitespace.
///
/// # Examples
/// ```
/// use blog_client::domain::Credentials;
///
/// let creds = Credentials::try_from_parts(" ada@example.test ", "secret").unwrap();
/// assert_eq!(creds.email(), "ada@example.test");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    email: String,
    password: Zeroizing<String>,
}

impl Credentials {
    /// Construct credentials from raw form inputs.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, AuthValidationError> {
        let email = normalise_email(email)?;
        if password.is_empty() {
            return Err(AuthValidationError::EmptyPassword);
        }
        Ok(Self {
            email,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// E-mail address identifying the account.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Password provided by the caller.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// Raw sign-up form values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub username: String,
}

/// Validated sign-up request forwarded to the provider.
///
/// The username seeds the profile the provider creates server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpRequest {
    credentials: Credentials,
    username: Username,
}

impl SignUpRequest {
    /// Validate a sign-up form.
    ///
    /// Checks run in the order a user fixes them: confirmation, length,
    /// then username.
    pub fn try_from_form(
        form: &SignUpForm,
        min_password_length: usize,
    ) -> Result<Self, AuthValidationError> {
        let email = normalise_email(&form.email)?;
        if form.password != form.confirm_password {
            return Err(AuthValidationError::PasswordMismatch);
        }
        if form.password.chars().count() < min_password_length {
            return Err(AuthValidationError::PasswordTooShort {
                min: min_password_length,
            });
        }
        let username =
            Username::new(form.username.clone()).map_err(AuthValidationError::Username)?;
        Ok(Self {
            credentials: Credentials {
                email,
                password: Zeroizing::new(form.password.clone()),
            },
            username,
        })
    }

    /// Credentials for the new account.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Requested profile username.
    #[must_use]
    pub fn username(&self) -> &Username {
        &self.username
    }
}
