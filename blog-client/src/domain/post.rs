//! Post data model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Slug, SlugValidationError, UserId};

/// Stable post identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(Uuid);

impl PostId {
    /// Generate a new random [`PostId`].
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

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An authored content item with a publish state.
///
/// ## Invariants
/// - Only the author may mutate or delete the post.
/// - A draft (`is_published == false`) is readable by its author only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub title: String,
    /// Raw markup; rendering happens outside the core.
    pub content: String,
    pub slug: Slug,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// The writable fields of this post.
    #[must_use]
    pub fn content_fields(&self) -> PostContent {
        PostContent {
            title: self.title.clone(),
            content: self.content.clone(),
            slug: self.slug.clone(),
            is_published: self.is_published,
        }
    }
}

/// Validation errors raised by [`PostContent::try_from_fields`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostValidationError {
    EmptyTitle,
    EmptyContent,
    Slug(SlugValidationError),
}

impl PostValidationError {
    /// Name of the offending field.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyTitle => "title",
            Self::EmptyContent => "content",
            Self::Slug(_) => "slug",
        }
    }

    /// Machine-readable rejection code.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::EmptyTitle | Self::EmptyContent | Self::Slug(SlugValidationError::Empty) => {
                "empty"
            }
            Self::Slug(SlugValidationError::InvalidCharacters) => "invalid_chars",
        }
    }
}

impl fmt::Display for PostValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::EmptyContent => write!(f, "content must not be empty"),
            Self::Slug(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for PostValidationError {}

/// Raw editor fields as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFields {
    pub title: String,
    pub content: String,
    pub slug: String,
    pub is_published: bool,
}

/// Validated writable post fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostContent {
    pub title: String,
    pub content: String,
    pub slug: Slug,
    pub is_published: bool,
}

impl PostContent {
    /// Validate raw editor fields.
    pub fn try_from_fields(fields: &PostFields) -> Result<Self, PostValidationError> {
        if fields.title.trim().is_empty() {
            return Err(PostValidationError::EmptyTitle);
        }
        if fields.content.trim().is_empty() {
            return Err(PostValidationError::EmptyContent);
        }
        let slug = Slug::new(fields.slug.clone()).map_err(PostValidationError::Slug)?;
        Ok(Self {
            title: fields.title.clone(),
            content: fields.content.clone(),
            slug,
            is_published: fields.is_published,
        })
    }
}

/// Full post record sent to the store on create and update.
///
/// The author id is always resent so store-side ownership policies can
/// check it; partial patches are never issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostWrite {
    pub author_id: UserId,
    #[serde(flatten)]
    pub content: PostContent,
}

/// Which posts a listing may include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingScope {
    /// Published posts only.
    PublishedOnly,
    /// Drafts and published posts; reserved for the author.
    Everything,
}

impl ListingScope {
    /// Whether the store query must filter to published posts.
    #[must_use]
    pub const fn published_only(self) -> bool {
        matches!(self, Self::PublishedOnly)
    }
}
