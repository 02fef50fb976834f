//! Post workflows: public reads and owner-only mutations.
//!
//! Every mutation follows the same pipeline: validate the input, authorize
//! against the session snapshot it was issued with, call the store, and
//! only on success reconcile the session cache. Failures leave cached
//! state untouched and are returned as typed errors; nothing is retried.

use std::cmp::Reverse;
use std::sync::Arc;

use tracing::{debug, info};

use super::authorization::{Requirement, authorize};
use super::ports::{Constraint, PostRepository, ProfileRepository, StoreError};
use super::session_cache::CachedEntity;
use super::store_mapping::map_store_error;
use super::visibility::{can_read, listing_scope, retain_readable};
use super::{
    Error, ListingScope, Post, PostContent, PostFields, PostId, PostValidationError, PostWrite,
    Profile, SessionCache, SessionState, Slug, Username,
};

/// A post as shown on its detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostView {
    pub post: Post,
    /// `None` when the author's profile could not be found.
    pub author_username: Option<Username>,
}

/// An author's public blog page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorPosts {
    pub profile: Profile,
    /// Newest first.
    pub posts: Vec<Post>,
}

fn validation_error(err: &PostValidationError) -> Error {
    Error::validation(err.field(), err.reason(), err.to_string())
}

fn map_write_error(context: &str, slug: &Slug, error: StoreError) -> Error {
    match error {
        StoreError::ConstraintViolation {
            constraint: Constraint::Slug,
        } => Error::slug_conflict(slug.as_ref()),
        other => map_store_error(context, other),
    }
}

fn newest_first(posts: &mut [Post]) {
    posts.sort_by_key(|post| Reverse(post.created_at));
}

/// Post workflows over the post and profile stores.
pub struct PostService<R: ?Sized, P: ?Sized> {
    posts: Arc<R>,
    profiles: Arc<P>,
    cache: Arc<SessionCache>,
}

impl<R, P> PostService<R, P>
where
    R: PostRepository + ?Sized,
    P: ProfileRepository + ?Sized,
{
    /// Create a service sharing `cache` with the session store.
    pub fn new(posts: Arc<R>, profiles: Arc<P>, cache: Arc<SessionCache>) -> Self {
        Self {
            posts,
            profiles,
            cache,
        }
    }

    /// Persist a new post authored by the signed-in user.
    ///
    /// # Errors
    /// `ValidationFailed` for blank fields, `Unauthenticated` without a
    /// session, `SlugConflict` when the slug is taken.
    pub async fn create_post(
        &self,
        session: &SessionState,
        fields: &PostFields,
    ) -> Result<Post, Error> {
        let content = PostContent::try_from_fields(fields).map_err(|err| validation_error(&err))?;
        let author_id = authorize(session, Requirement::Identity)?.user_id;
        let write = PostWrite { author_id, content };

        let post = self
            .posts
            .create_post(&write)
            .await
            .map_err(|err| map_write_error("creating post", &write.content.slug, err))?;
        self.cache.put(session, CachedEntity::Post(post.clone()));
        info!(post_id = %post.id, slug = %post.slug, user_id = %author_id, "post created");
        Ok(post)
    }

    /// Load a post into the editor, preferring the session cache.
    ///
    /// # Errors
    /// `NotFound` when the post does not exist, `Forbidden` when the
    /// session does not own it.
    pub async fn load_post_for_edit(
        &self,
        session: &SessionState,
        id: &PostId,
    ) -> Result<Post, Error> {
        authorize(session, Requirement::Identity)?;
        if let Some(post) = self.cache.post(session, id) {
            return Ok(post);
        }
        self.fetch_owned(session, id).await
    }

    /// Replace every writable field of a post.
    ///
    /// The full record, including the author id, is resent.
    ///
    /// # Errors
    /// `ValidationFailed` for blank fields, `Forbidden` when the session
    /// does not own the post, `NotFound` when it vanished, `SlugConflict`
    /// when the new slug is taken.
    pub async fn update_post(
        &self,
        session: &SessionState,
        id: &PostId,
        fields: &PostFields,
    ) -> Result<Post, Error> {
        let content = PostContent::try_from_fields(fields).map_err(|err| validation_error(&err))?;
        let current = self.load_post_for_edit(session, id).await?;
        let write = PostWrite {
            author_id: current.author_id,
            content,
        };

        let post = self
            .posts
            .update_post(id, &write)
            .await
            .map_err(|err| {
                self.after_failed_write(id, "updating post", &write.content.slug, err)
            })?;
        self.cache.put(session, CachedEntity::Post(post.clone()));
        info!(post_id = %id, slug = %post.slug, "post updated");
        Ok(post)
    }

    /// Delete a post permanently.
    ///
    /// # Errors
    /// `NotFound` when the post does not exist, `Forbidden` when the
    /// session does not own it.
    pub async fn delete_post(&self, session: &SessionState, id: &PostId) -> Result<(), Error> {
        authorize(session, Requirement::Identity)?;
        self.fetch_owned(session, id).await?;
        self.posts
            .delete_post(id)
            .await
            .map_err(|err| map_store_error("deleting post", err))?;
        self.cache.invalidate_post(id);
        info!(post_id = %id, "post deleted");
        Ok(())
    }

    /// Flip a post's publish state.
    ///
    /// The post is always re-fetched from the store so the write carries
    /// the latest title, content and slug.
    ///
    /// # Errors
    /// `NotFound` when the post does not exist, `Forbidden` when the
    /// session does not own it.
    pub async fn toggle_publish(&self, session: &SessionState, id: &PostId) -> Result<Post, Error> {
        authorize(session, Requirement::Identity)?;
        let current = self.fetch_owned(session, id).await?;
        let mut content = current.content_fields();
        content.is_published = !content.is_published;
        let write = PostWrite {
            author_id: current.author_id,
            content,
        };

        let post = self
            .posts
            .update_post(id, &write)
            .await
            .map_err(|err| {
                self.after_failed_write(id, "toggling publish state", &write.content.slug, err)
            })?;
        self.cache.put(session, CachedEntity::Post(post.clone()));
        info!(post_id = %id, is_published = post.is_published, "publish state toggled");
        Ok(post)
    }

    /// Load a post by slug for `viewer`.
    ///
    /// Drafts of other authors are reported as `NotFound` so their
    /// existence is not revealed.
    pub async fn get_post_by_slug(
        &self,
        viewer: &SessionState,
        slug: &str,
    ) -> Result<PostView, Error> {
        let not_found = || Error::not_found(format!("no post with slug `{slug}`"));
        let Ok(slug) = Slug::new(slug) else {
            return Err(not_found());
        };
        let post = self
            .posts
            .get_post_by_slug(&slug)
            .await
            .map_err(|err| map_store_error("loading post", err))?
            .ok_or_else(not_found)?;
        if !can_read(viewer, &post) {
            if !viewer.is_settled() {
                return Err(Error::session_pending());
            }
            debug!(post_id = %post.id, "hiding unpublished post from viewer");
            return Err(not_found());
        }

        let author_username = self
            .profiles
            .get_profile(&post.author_id)
            .await
            .map_err(|err| map_store_error("loading author", err))?
            .map(|profile| profile.username);
        Ok(PostView {
            post,
            author_username,
        })
    }

    /// An author's blog as `viewer` may see it.
    ///
    /// Only the author sees drafts. The scope is pushed down to the store
    /// and re-applied to the rows it returns.
    pub async fn list_posts_by_username(
        &self,
        viewer: &SessionState,
        username: &str,
    ) -> Result<AuthorPosts, Error> {
        if !viewer.is_settled() {
            return Err(Error::session_pending());
        }
        let not_found = || Error::not_found(format!("no profile named `{username}`"));
        let Ok(username) = Username::new(username) else {
            return Err(not_found());
        };
        let profile = self
            .profiles
            .find_profile_by_username(&username)
            .await
            .map_err(|err| map_store_error("looking up author", err))?
            .ok_or_else(not_found)?;

        let scope = listing_scope(viewer, &profile.id);
        let fetched = self
            .posts
            .list_posts_by_author(&profile.id, scope)
            .await
            .map_err(|err| map_store_error("listing posts", err))?;
        let mut posts = retain_readable(viewer, fetched);
        newest_first(&mut posts);
        Ok(AuthorPosts { profile, posts })
    }

    /// Every post of the signed-in user, drafts included, newest first.
    pub async fn list_own_posts(&self, session: &SessionState) -> Result<Vec<Post>, Error> {
        let author_id = authorize(session, Requirement::Identity)?.user_id;
        let fetched = self
            .posts
            .list_posts_by_author(&author_id, ListingScope::Everything)
            .await
            .map_err(|err| map_store_error("listing own posts", err))?;
        let mut posts = retain_readable(session, fetched);
        newest_first(&mut posts);
        Ok(posts)
    }

    async fn fetch_owned(&self, session: &SessionState, id: &PostId) -> Result<Post, Error> {
        let post = self
            .posts
            .get_post(id)
            .await
            .map_err(|err| map_store_error("loading post", err))?
            .ok_or_else(|| Error::not_found(format!("post {id} not found")))?;
        authorize(session, Requirement::OwnerOf(&post.author_id))?;
        self.cache.put(session, CachedEntity::Post(post.clone()));
        Ok(post)
    }

    fn after_failed_write(
        &self,
        id: &PostId,
        context: &str,
        slug: &Slug,
        error: StoreError,
    ) -> Error {
        if matches!(error, StoreError::NotFound { .. }) {
            self.cache.invalidate_post(id);
        }
        map_write_error(context, slug, error)
    }
}
