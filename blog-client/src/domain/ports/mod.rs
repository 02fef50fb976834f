//! Domain ports defining the edges of the hexagon.
//!
//! The authentication provider and the persistent store are external
//! systems. Each trait exposes strongly typed errors so adapters map their
//! failures into predictable variants; in particular uniqueness violations
//! arrive as [`StoreError::ConstraintViolation`] rather than as opaque
//! strings.

use std::fmt;

mod macros;

pub(crate) use macros::define_port_error;

mod auth_provider;
mod post_repository;
mod profile_repository;
mod store_error;

#[cfg(test)]
pub use auth_provider::MockAuthProvider;
pub use auth_provider::{AuthProvider, AuthProviderError, SignUpResult};
#[cfg(test)]
pub use post_repository::MockPostRepository;
pub use post_repository::PostRepository;
#[cfg(test)]
pub use profile_repository::MockProfileRepository;
pub use profile_repository::ProfileRepository;
pub use store_error::StoreError;

/// Unique constraint reported by the store or provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// `profiles.username` is unique.
    Username,
    /// `posts.slug` is unique across all authors.
    Slug,
    /// Accounts are unique per e-mail address.
    Email,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Username => f.write_str("username"),
            Self::Slug => f.write_str("slug"),
            Self::Email => f.write_str("email"),
        }
    }
}
