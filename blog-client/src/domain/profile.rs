//! Profile data model.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::UserId;

/// Maximum allowed length for a username, in characters.
pub const USERNAME_MAX: usize = 30;

/// Validation errors returned by [`Username::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsernameValidationError {
    Empty,
    TooLong { max: usize },
    InvalidCharacters,
}

impl UsernameValidationError {
    /// Machine-readable rejection code.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::TooLong { .. } => "too_long",
            Self::InvalidCharacters => "invalid_chars",
        }
    }
}

impl fmt::Display for UsernameValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "username must not be empty"),
            Self::TooLong { max } => write!(f, "username must be at most {max} characters"),
            Self::InvalidCharacters => write!(
                f,
                "username may only contain Chinese characters, letters, digits, or underscores",
            ),
        }
    }
}

impl std::error::Error for UsernameValidationError {}

static USERNAME_RE: OnceLock<Regex> = OnceLock::new();

fn username_regex() -> &'static Regex {
    USERNAME_RE.get_or_init(|| {
        // Length is enforced separately; this regex constrains allowed characters.
        let pattern = r"^[A-Za-z0-9_\x{4e00}-\x{9fa5}]+$";
        Regex::new(pattern)
            .unwrap_or_else(|error| panic!("username regex failed to compile: {error}"))
    })
}

/// Public, unique handle of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Validate and construct a [`Username`].
    ///
    /// # Examples
    /// ```
    /// use blog_client::domain::Username;
    ///
    /// assert!(Username::new("张三_01").is_ok());
    /// assert!(Username::new("bad name!").is_err());
    /// ```
    pub fn new(username: impl Into<String>) -> Result<Self, UsernameValidationError> {
        Self::from_owned(username.into())
    }

    fn from_owned(username: String) -> Result<Self, UsernameValidationError> {
        if username.is_empty() {
            return Err(UsernameValidationError::Empty);
        }
        if username.chars().count() > USERNAME_MAX {
            return Err(UsernameValidationError::TooLong { max: USERNAME_MAX });
        }
        if !username_regex().is_match(&username) {
            return Err(UsernameValidationError::InvalidCharacters);
        }
        Ok(Self(username))
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl TryFrom<String> for Username {
    type Error = UsernameValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Public user record keyed by session identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Equals the owning session's user id.
    pub id: UserId,
    pub username: Username,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// Raw profile edit form as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub username: String,
    pub avatar_url: String,
    pub bio: String,
}

impl From<&Profile> for ProfileForm {
    fn from(profile: &Profile) -> Self {
        Self {
            username: profile.username.to_string(),
            avatar_url: profile.avatar_url.clone().unwrap_or_default(),
            bio: profile.bio.clone().unwrap_or_default(),
        }
    }
}

/// Validated profile changes ready for the store.
///
/// Blank optional fields are normalised to `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileChanges {
    pub username: Username,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

impl ProfileChanges {
    /// Validate a raw form.
    pub fn try_from_form(form: &ProfileForm) -> Result<Self, UsernameValidationError> {
        Ok(Self {
            username: Username::new(form.username.clone())?,
            avatar_url: non_blank(&form.avatar_url),
            bio: non_blank(&form.bio),
        })
    }

    /// Apply the changes to a profile, producing the updated record.
    #[must_use]
    pub fn apply_to(&self, profile: &Profile) -> Profile {
        Profile {
            id: profile.id,
            username: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
            bio: self.bio.clone(),
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}
