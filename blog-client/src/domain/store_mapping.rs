//! Translation of driven-port failures into domain errors.

use super::ports::{AuthProviderError, Constraint, StoreError};
use super::{Error, ErrorCode};

/// Map a store failure onto the closest domain error kind.
///
/// Unclassified failures become [`ErrorCode::Transient`] carrying the raw
/// message; callers decide whether to retry.
pub(crate) fn map_store_error(context: &str, error: StoreError) -> Error {
    match error {
        StoreError::NotFound { message } => Error::not_found(format!("{context}: {message}")),
        StoreError::ConstraintViolation {
            constraint: Constraint::Username,
        } => Error::new(
            ErrorCode::UsernameTaken,
            format!("{context}: username is already taken"),
        ),
        StoreError::ConstraintViolation {
            constraint: Constraint::Slug,
        } => Error::new(
            ErrorCode::SlugConflict,
            format!("{context}: slug is already used by another post"),
        ),
        StoreError::Rejected { message } => Error::forbidden(format!("{context}: {message}")),
        other @ (StoreError::Transport { .. } | StoreError::ConstraintViolation { .. }) => {
            Error::transient(context, other.to_string())
        }
    }
}

/// Map an authentication provider failure onto a domain error.
pub(crate) fn map_provider_error(context: &str, error: AuthProviderError) -> Error {
    match error {
        AuthProviderError::InvalidCredentials => {
            Error::unauthenticated("invalid e-mail or password")
        }
        AuthProviderError::ConstraintViolation {
            constraint: Constraint::Username,
        } => Error::new(ErrorCode::UsernameTaken, "username is already taken"),
        AuthProviderError::ConstraintViolation {
            constraint: Constraint::Email,
        } => Error::validation(
            "email",
            "taken",
            "an account with this e-mail already exists",
        ),
        other @ (AuthProviderError::Transport { .. }
        | AuthProviderError::Rejected { .. }
        | AuthProviderError::ConstraintViolation { .. }) => {
            Error::transient(context, other.to_string())
        }
    }
}
