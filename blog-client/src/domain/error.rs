//! Domain-level error types.
//!
//! These errors are transport agnostic. Whatever renders the client (a UI,
//! a CLI, a test harness) maps them to user-facing messages; the code is
//! stable and the message is for humans.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// No session is present but the operation requires one.
    Unauthenticated,
    /// A session is present but it does not own the target entity.
    Forbidden,
    /// The entity id, slug, or username has no match.
    NotFound,
    /// Field-level input validation failed before any store call.
    ValidationFailed,
    /// The requested username belongs to another profile.
    UsernameTaken,
    /// The requested slug belongs to another post.
    SlugConflict,
    /// Network or store failure; safe to retry manually.
    Transient,
    /// The session has not been resolved yet; await a settled session first.
    SessionPending,
}

/// Where the caller should send the user after a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectTarget {
    /// The sign-in entry point.
    SignIn,
}

impl RedirectTarget {
    /// Route path conventionally used for the target.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::SignIn => "/signin",
        }
    }
}

/// Domain error payload.
///
/// # Examples
/// ```
/// use blog_client::domain::{Error, ErrorCode};
///
/// let err = Error::not_found("post missing");
/// assert_eq!(err.code(), ErrorCode::NotFound);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct DomainError {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl DomainError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Supplementary structured details.
    #[must_use]
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Attach structured details to the error.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Redirect target recorded on authentication denials.
    #[must_use]
    pub fn redirect(&self) -> Option<RedirectTarget> {
        self.details
            .as_ref()
            .and_then(|details| details.get("redirect"))
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Convenience constructor for [`ErrorCode::Unauthenticated`].
    ///
    /// The error carries a sign-in redirect in its details.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthenticated, message).with_details(json!({
            "redirect": RedirectTarget::SignIn,
            "path": RedirectTarget::SignIn.path(),
        }))
    }

    /// Convenience constructor for [`ErrorCode::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::ValidationFailed`].
    ///
    /// `field` names the offending input and `reason` is a stable
    /// snake-case rejection code.
    pub fn validation(field: &str, reason: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message).with_details(json!({
            "field": field,
            "reason": reason,
        }))
    }

    /// Convenience constructor for [`ErrorCode::UsernameTaken`].
    pub fn username_taken(username: &str) -> Self {
        Self::new(
            ErrorCode::UsernameTaken,
            format!("username `{username}` is already taken"),
        )
    }

    /// Convenience constructor for [`ErrorCode::SlugConflict`].
    pub fn slug_conflict(slug: &str) -> Self {
        Self::new(
            ErrorCode::SlugConflict,
            format!("slug `{slug}` is already used by another post"),
        )
    }

    /// Convenience constructor for [`ErrorCode::Transient`].
    ///
    /// The raw store message is kept in the details for diagnosis.
    pub fn transient(context: &str, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self::new(ErrorCode::Transient, format!("{context}: {raw}"))
            .with_details(json!({ "raw": raw }))
    }

    /// Convenience constructor for [`ErrorCode::SessionPending`].
    pub fn session_pending() -> Self {
        Self::new(
            ErrorCode::SessionPending,
            "session is still being resolved; wait for it to settle",
        )
    }
}
