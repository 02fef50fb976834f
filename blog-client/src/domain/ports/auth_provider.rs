//! Driven port for the external authentication provider.
//!
//! The provider owns credentials and issues sessions. The client never
//! looks at passwords beyond local validation; it forwards them here and
//! reacts to the session the provider hands back.

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{Constraint, define_port_error};
use crate::domain::{Credentials, Session, SignUpRequest, UserId};

define_port_error! {
    /// Failures reported by the authentication provider.
    pub enum AuthProviderError {
        /// The provider could not be reached.
        Transport { message: String } => "auth provider transport failed: {message}",
        /// E-mail and password did not match an account.
        InvalidCredentials => "invalid login credentials",
        /// A unique constraint (e-mail, or the username seed) was violated.
        ConstraintViolation { constraint: Constraint } => "auth provider constraint violated: {constraint}",
        /// The provider refused the request for another reason.
        Rejected { message: String } => "auth provider rejected the request: {message}",
    }
}

/// Result of a successful sign-up call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpResult {
    /// Identity of the new account; its profile shares this id.
    pub user_id: UserId,
    /// Present when the provider signed the user in immediately; absent
    /// when the account still awaits e-mail confirmation.
    pub session: Option<Session>,
}

/// Authentication provider used by the session store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Return the provider's current session, if any.
    async fn get_session(&self) -> Result<Option<Session>, AuthProviderError>;

    /// Create an account and seed its profile with the requested username.
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpResult, AuthProviderError>;

    /// Exchange e-mail and password for a session.
    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<Session, AuthProviderError>;

    /// End the current session.
    async fn sign_out(&self) -> Result<(), AuthProviderError>;

    /// Subscribe to session changes originating inside the provider
    /// (token refresh, sign-out elsewhere, confirmation links).
    fn subscribe(&self) -> broadcast::Receiver<Option<Session>>;
}
