//! Session identity model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validation errors returned when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdValidationError {
    /// Identifier was empty.
    #[error("identifier must not be empty")]
    Empty,
    /// Identifier was not a valid UUID.
    #[error("identifier must be a valid UUID")]
    Invalid,
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, IdValidationError> {
    if raw.is_empty() {
        return Err(IdValidationError::Empty);
    }
    if raw.trim() != raw {
        return Err(IdValidationError::Invalid);
    }
    Uuid::parse_str(raw).map_err(|_| IdValidationError::Invalid)
}

/// Stable user identifier shared by the session and its profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Validate and construct a [`UserId`] from a UUID string.
    pub fn new(id: impl AsRef<str>) -> Result<Self, IdValidationError> {
        parse_uuid(id.as_ref()).map(Self)
    }

    /// Generate a new random [`UserId`].
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An authenticated identity bound to this client instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Identity of the signed-in user; equals their profile id.
    pub user_id: UserId,
    /// E-mail address the user signed in with.
    pub email: String,
    /// When the provider issued the session.
    pub created_at: DateTime<Utc>,
}

/// The client's current view of authentication.
///
/// `Unknown` holds only until the provider answers the initial query. It
/// is not the same as `Anonymous`: gated operations must wait rather than
/// deny while the state is unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// The provider has not answered yet.
    #[default]
    Unknown,
    /// Resolved: nobody is signed in.
    Anonymous,
    /// Resolved: a user is signed in.
    Authenticated(Session),
}

impl SessionState {
    /// Build a resolved state from an optional provider session.
    #[must_use]
    pub fn from_session(session: Option<Session>) -> Self {
        session.map_or(Self::Anonymous, Self::Authenticated)
    }

    /// Whether the state is decidable (anything but `Unknown`).
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// The signed-in session, if any.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            Self::Unknown | Self::Anonymous => None,
        }
    }

    /// The signed-in user id, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<&UserId> {
        self.session().map(|session| &session.user_id)
    }

    /// Whether the state belongs to `user_id`.
    #[must_use]
    pub fn is_user(&self, user_id: &UserId) -> bool {
        self.user_id() == Some(user_id)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            Self::Anonymous => f.write_str("anonymous"),
            Self::Authenticated(session) => write!(f, "authenticated({})", session.user_id),
        }
    }
}
