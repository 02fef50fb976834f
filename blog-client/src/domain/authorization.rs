//! Authorization gate for protected operations.
//!
//! Every protected operation moves through `Pending → Granted | Denied`.
//! `Pending` is only ever produced while the session is unknown; callers
//! wait for the session store to settle instead of rendering a denial.

use super::{Error, RedirectTarget, Session, SessionState, UserId};

/// What an operation demands of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement<'a> {
    /// Any signed-in identity (edit own profile, create a post).
    Identity,
    /// The signed-in identity must own the entity authored by this id.
    OwnerOf(&'a UserId),
}

/// Why access was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// No session; the caller should send the user to sign in.
    Unauthenticated,
    /// A session exists but does not own the entity.
    Forbidden,
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// The session is not known yet.
    Pending,
    /// The operation may proceed.
    Granted,
    /// The operation is refused.
    Denied {
        reason: DenialReason,
        redirect: Option<RedirectTarget>,
    },
}

/// Decide whether `state` satisfies `requirement`.
///
/// # Examples
/// ```
/// use blog_client::domain::{decide, AccessDecision, Requirement, SessionState};
///
/// assert_eq!(decide(&SessionState::Unknown, Requirement::Identity), AccessDecision::Pending);
/// ```
#[must_use]
pub fn decide(state: &SessionState, requirement: Requirement<'_>) -> AccessDecision {
    match (state, requirement) {
        (SessionState::Unknown, _) => AccessDecision::Pending,
        (SessionState::Anonymous, _) => AccessDecision::Denied {
            reason: DenialReason::Unauthenticated,
            redirect: Some(RedirectTarget::SignIn),
        },
        (SessionState::Authenticated(_), Requirement::Identity) => AccessDecision::Granted,
        (SessionState::Authenticated(session), Requirement::OwnerOf(owner)) => {
            if &session.user_id == owner {
                AccessDecision::Granted
            } else {
                AccessDecision::Denied {
                    reason: DenialReason::Forbidden,
                    redirect: None,
                }
            }
        }
    }
}

/// Enforce `requirement`, returning the session the operation runs under.
///
/// `Pending` becomes [`crate::domain::ErrorCode::SessionPending`] so that
/// workflows never turn an unknown session into a denial.
pub fn authorize<'s>(
    state: &'s SessionState,
    requirement: Requirement<'_>,
) -> Result<&'s Session, Error> {
    match decide(state, requirement) {
        AccessDecision::Pending => Err(Error::session_pending()),
        AccessDecision::Denied {
            reason: DenialReason::Unauthenticated,
            ..
        } => Err(Error::unauthenticated("sign in to continue")),
        AccessDecision::Denied {
            reason: DenialReason::Forbidden,
            ..
        } => Err(Error::forbidden("you do not own this content")),
        AccessDecision::Granted => state
            .session()
            .ok_or_else(|| Error::unauthenticated("sign in to continue")),
    }
}
