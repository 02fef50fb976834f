//! Local state of the author's "manage posts" listing.
//!
//! The listing mirrors the store only after confirmed mutations: a delete
//! removes the row once the store accepted it, and a publish toggle
//! replaces the row with the record the store returned.

use std::cmp::Reverse;

use tracing::debug;

use super::ports::{PostRepository, ProfileRepository};
use super::post_service::PostService;
use super::{Error, Post, PostId, SessionState};

/// What happened to a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The store deleted the post and the row was removed.
    Deleted,
    /// The user declined the confirmation; nothing was sent.
    Cancelled,
}

/// The signed-in author's posts, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostListing {
    posts: Vec<Post>,
}

impl PostListing {
    /// Build a listing from rows in any order.
    #[must_use]
    pub fn from_posts(posts: Vec<Post>) -> Self {
        let mut listing = Self::default();
        listing.replace(posts);
        listing
    }

    /// Current rows.
    #[must_use]
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// Look up a row.
    #[must_use]
    pub fn get(&self, id: &PostId) -> Option<&Post> {
        self.posts.iter().find(|post| &post.id == id)
    }

    /// Replace every row.
    pub fn replace(&mut self, mut posts: Vec<Post>) {
        posts.sort_by_key(|post| Reverse(post.created_at));
        self.posts = posts;
    }

    /// Swap in the stored version of a row, inserting it if absent.
    pub fn upsert(&mut self, post: Post) {
        match self.posts.iter_mut().find(|row| row.id == post.id) {
            Some(row) => *row = post,
            None => {
                self.posts.push(post);
                self.posts.sort_by_key(|row| Reverse(row.created_at));
            }
        }
    }

    /// Drop a row.
    pub fn remove(&mut self, id: &PostId) -> Option<Post> {
        let index = self.posts.iter().position(|post| &post.id == id)?;
        Some(self.posts.remove(index))
    }

    /// Reload every row for the signed-in author.
    pub async fn refresh<R, P>(
        &mut self,
        service: &PostService<R, P>,
        session: &SessionState,
    ) -> Result<(), Error>
    where
        R: PostRepository + ?Sized,
        P: ProfileRepository + ?Sized,
    {
        let posts = service.list_own_posts(session).await?;
        self.replace(posts);
        Ok(())
    }

    /// Ask `confirm`, then delete the post and drop its row.
    ///
    /// The row stays when the user cancels or the store call fails.
    pub async fn delete<R, P, F>(
        &mut self,
        service: &PostService<R, P>,
        session: &SessionState,
        id: &PostId,
        confirm: F,
    ) -> Result<DeleteOutcome, Error>
    where
        R: PostRepository + ?Sized,
        P: ProfileRepository + ?Sized,
        F: FnOnce(Option<&Post>) -> bool,
    {
        if !confirm(self.get(id)) {
            debug!(post_id = %id, "delete cancelled");
            return Ok(DeleteOutcome::Cancelled);
        }
        service.delete_post(session, id).await?;
        self.remove(id);
        Ok(DeleteOutcome::Deleted)
    }

    /// Toggle a post's publish state and replace its row.
    pub async fn toggle_publish<R, P>(
        &mut self,
        service: &PostService<R, P>,
        session: &SessionState,
        id: &PostId,
    ) -> Result<Post, Error>
    where
        R: PostRepository + ?Sized,
        P: ProfileRepository + ?Sized,
    {
        let post = service.toggle_publish(session, id).await?;
        self.upsert(post.clone());
        Ok(post)
    }
}
