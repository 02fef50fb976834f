//! Driven port for profile persistence.
use async_trait::async_trait;

use super::StoreError;
use crate::domain::{Profile, ProfileChanges, UserId, Username};

/// Profile table access.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Fetch a profile by its id.
    async fn get_profile(&self, id: &UserId) -> Result<Option<Profile>, StoreError>;

    /// Fetch a profile by its unique username.
    async fn find_profile_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Profile>, StoreError>;

    /// Overwrite the editable fields of a profile and return the stored row.
    ///
    /// A username owned by another profile fails with
    /// [`StoreError::ConstraintViolation`].
    async fn update_profile(
        &self,
        id: &UserId,
        changes: &ProfileChanges,
    ) -> Result<Profile, StoreError>;
}
