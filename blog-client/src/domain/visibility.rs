//! Content visibility rules.
//!
//! Published posts are public; drafts belong to their author alone. Write
//! access depends on authorship only, never on publish state. Listing
//! filters are pushed down to the store and then re-applied here because
//! the store is not trusted to enforce them unilaterally.

use tracing::warn;

use super::{ListingScope, Post, SessionState, UserId};

/// Whether `viewer` may read `post`.
#[must_use]
pub fn can_read(viewer: &SessionState, post: &Post) -> bool {
    post.is_published || viewer.is_user(&post.author_id)
}

/// Whether `viewer` may modify or delete `post`.
#[must_use]
pub fn can_write(viewer: &SessionState, post: &Post) -> bool {
    viewer.is_user(&post.author_id)
}

/// Listing scope for `viewer` looking at `author_id`'s posts.
#[must_use]
pub fn listing_scope(viewer: &SessionState, author_id: &UserId) -> ListingScope {
    if viewer.is_user(author_id) {
        ListingScope::Everything
    } else {
        ListingScope::PublishedOnly
    }
}

/// Drop every post `viewer` may not read.
///
/// Rows removed here indicate a store that ignored the pushed-down filter.
#[must_use]
pub fn retain_readable(viewer: &SessionState, posts: Vec<Post>) -> Vec<Post> {
    let fetched = posts.len();
    let readable: Vec<Post> = posts
        .into_iter()
        .filter(|post| can_read(viewer, post))
        .collect();
    let dropped = fetched - readable.len();
    if dropped > 0 {
        warn!(dropped, viewer = %viewer, "store returned posts the viewer may not read");
    }
    readable
}
