//! Driven port for post persistence.
//!
//! The store is not trusted to enforce visibility on its own; callers push
//! the published-only filter down and re-check rows afterwards.
use async_trait::async_trait;

use super::StoreError;
use crate::domain::{ListingScope, Post, PostId, PostWrite, Slug, UserId};

/// Post table access.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Fetch a post by id.
    async fn get_post(&self, id: &PostId) -> Result<Option<Post>, StoreError>;

    /// Fetch a post by its globally unique slug.
    async fn get_post_by_slug(&self, slug: &Slug) -> Result<Option<Post>, StoreError>;

    /// List an author's posts, newest first.
    async fn list_posts_by_author(
        &self,
        author_id: &UserId,
        scope: ListingScope,
    ) -> Result<Vec<Post>, StoreError>;

    /// Insert a post; a duplicate slug fails with a constraint violation.
    async fn create_post(&self, post: &PostWrite) -> Result<Post, StoreError>;

    /// Replace every writable field of a post and return the stored row.
    ///
    /// Fails with [`StoreError::NotFound`] when the id no longer exists.
    async fn update_post(&self, id: &PostId, post: &PostWrite) -> Result<Post, StoreError>;

    /// Delete a post permanently.
    async fn delete_post(&self, id: &PostId) -> Result<(), StoreError>;
}
