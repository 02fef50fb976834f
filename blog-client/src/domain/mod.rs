//! Domain primitives, policies and workflows.
//!
//! Purpose: model sessions, profiles and posts with strongly typed values,
//! decide who may read or change what, and run the mutation workflows
//! against the driven ports in [`ports`]. Nothing here knows how the store
//! or the authentication provider are reached.
//!
//! Public surface:
//! - Error (alias to `error::DomainError`) and ErrorCode: typed failures.
//! - SessionStore and SessionCache: the session owner and its cache guard.
//! - decide / authorize: the authorization gate.
//! - can_read / can_write / listing_scope: the visibility rules.
//! - AccountService, ProfileService, PostService: the workflows.

pub mod account_service;
pub mod auth;
pub mod authorization;
pub mod error;
pub mod ports;
pub mod post;
pub mod post_listing;
pub mod post_service;
pub mod profile;
pub mod profile_service;
pub mod session;
pub mod session_cache;
pub mod session_store;
pub mod slug;
mod store_mapping;
pub mod view_scope;
pub mod visibility;

pub use self::account_service::AccountService;
pub use self::auth::{
    AuthValidationError, Credentials, DEFAULT_MIN_PASSWORD_LENGTH, SignUpForm, SignUpRequest,
};
pub use self::authorization::{AccessDecision, DenialReason, Requirement, authorize, decide};
pub use self::error::{DomainError as Error, ErrorCode, RedirectTarget};
pub use self::post::{
    ListingScope, Post, PostContent, PostFields, PostId, PostValidationError, PostWrite,
};
pub use self::post_listing::{DeleteOutcome, PostListing};
pub use self::post_service::{AuthorPosts, PostService, PostView};
pub use self::profile::{
    Profile, ProfileChanges, ProfileForm, USERNAME_MAX, Username, UsernameValidationError,
};
pub use self::profile_service::ProfileService;
pub use self::session::{IdValidationError, Session, SessionState, UserId};
pub use self::session_cache::{CachedEntity, EntityKind, SessionCache};
pub use self::session_store::{ChangeListener, SessionStore, SessionSubscription, SignUpOutcome};
pub use self::slug::{Slug, SlugField, SlugValidationError, derive_slug, slug_base};
pub use self::view_scope::{ScopeToken, ViewScope};
pub use self::visibility::{can_read, can_write, listing_scope, retain_readable};
