//! Account workflows: sign-up, sign-in, sign-out.
//!
//! Inputs are validated locally and the requested username is checked
//! against the profile store before the provider is called, so obvious
//! failures never create half-finished accounts.

use std::sync::Arc;

use tracing::info;

use super::ports::{AuthProvider, ProfileRepository};
use super::session_store::{SessionStore, SignUpOutcome};
use super::store_mapping::map_store_error;
use super::{
    AuthValidationError, Credentials, DEFAULT_MIN_PASSWORD_LENGTH, Error, Session, SignUpForm,
    SignUpRequest,
};

fn validation_error(err: &AuthValidationError) -> Error {
    Error::validation(err.field(), err.reason(), err.to_string())
}

/// Account workflows bound to one session store.
pub struct AccountService<A: ?Sized, P: ?Sized> {
    sessions: Arc<SessionStore<A>>,
    profiles: Arc<P>,
    min_password_length: usize,
}

impl<A, P> AccountService<A, P>
where
    A: AuthProvider + ?Sized + 'static,
    P: ProfileRepository + ?Sized,
{
    /// Create the service with the default password policy.
    pub fn new(sessions: Arc<SessionStore<A>>, profiles: Arc<P>) -> Self {
        Self {
            sessions,
            profiles,
            min_password_length: DEFAULT_MIN_PASSWORD_LENGTH,
        }
    }

    /// Override the minimum password length for new accounts.
    #[must_use]
    pub fn with_min_password_length(mut self, min_password_length: usize) -> Self {
        self.min_password_length = min_password_length;
        self
    }

    /// Register a new account.
    ///
    /// # Errors
    /// `ValidationFailed` for malformed input, `UsernameTaken` when the
    /// username already belongs to a profile, `Transient` on store or
    /// provider failure.
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<SignUpOutcome, Error> {
        let request = SignUpRequest::try_from_form(form, self.min_password_length)
            .map_err(|err| validation_error(&err))?;

        let existing = self
            .profiles
            .find_profile_by_username(request.username())
            .await
            .map_err(|err| map_store_error("checking username", err))?;
        if existing.is_some() {
            return Err(Error::username_taken(request.username().as_ref()));
        }

        let outcome = self.sessions.sign_up(&request).await?;
        info!(username = %request.username(), "account registered");
        Ok(outcome)
    }

    /// Sign in with raw form values.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, Error> {
        let credentials =
            Credentials::try_from_parts(email, password).map_err(|err| validation_error(&err))?;
        self.sessions.sign_in(&credentials).await
    }

    /// Sign out of the current session.
    pub async fn sign_out(&self) -> Result<(), Error> {
        self.sessions.sign_out().await
    }
}
