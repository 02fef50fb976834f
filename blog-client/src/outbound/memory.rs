//! In-memory authentication provider and blog store.
//!
//! [`InMemoryBlogStore`] implements [`AuthProvider`], [`ProfileRepository`]
//! and [`PostRepository`] over one mutex-guarded state. It behaves like the
//! hosted backend the client normally talks to:
//!
//! - usernames, account e-mails and post slugs are unique;
//! - writes are checked against the signed-in identity, mirroring the
//!   store's row-level policies, and refused with `Rejected`;
//! - sign-up may require e-mail confirmation before a session is issued;
//! - session changes are broadcast to subscribers.
//!
//! [`InMemoryBlogStore::fail_next`] arms a one-shot transport failure for
//! exercising error paths.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use mockable::Clock;
use tokio::sync::broadcast;
use tracing::debug;
use zeroize::Zeroizing;

use crate::domain::ports::{
    AuthProvider, AuthProviderError, Constraint, PostRepository, ProfileRepository, SignUpResult,
    StoreError,
};
use crate::domain::{
    Credentials, ListingScope, Post, PostId, PostWrite, Profile, ProfileChanges, Session,
    SignUpRequest, Slug, UserId, Username,
};

const NOTIFICATION_CAPACITY: usize = 16;

struct Account {
    user_id: UserId,
    email: String,
    password: Zeroizing<String>,
    confirmed: bool,
}

#[derive(Default)]
struct State {
    /// Keyed by lower-cased e-mail.
    accounts: HashMap<String, Account>,
    profiles: HashMap<UserId, Profile>,
    posts: HashMap<PostId, Post>,
    current: Option<Session>,
    armed_failure: Option<String>,
}

impl State {
    fn take_failure(&mut self) -> Option<String> {
        self.armed_failure.take()
    }

    fn signed_in_user(&self) -> Option<UserId> {
        self.current.as_ref().map(|session| session.user_id)
    }

    fn username_owner(&self, username: &Username) -> Option<UserId> {
        self.profiles
            .values()
            .find(|profile| profile.username == *username)
            .map(|profile| profile.id)
    }

    fn slug_owner(&self, slug: &Slug) -> Option<PostId> {
        self.posts
            .values()
            .find(|post| post.slug == *slug)
            .map(|post| post.id)
    }

    fn require_writer(&self, author_id: &UserId) -> Result<(), StoreError> {
        if self.signed_in_user().as_ref() == Some(author_id) {
            Ok(())
        } else {
            Err(StoreError::rejected("row-level policy refused the write"))
        }
    }
}

/// Process-local stand-in for the hosted auth provider and database.
pub struct InMemoryBlogStore {
    state: Mutex<State>,
    notifications: broadcast::Sender<Option<Session>>,
    clock: Arc<dyn Clock>,
    require_email_confirmation: bool,
}

impl InMemoryBlogStore {
    /// Create an empty store reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            state: Mutex::new(State::default()),
            notifications,
            clock,
            require_email_confirmation: false,
        }
    }

    /// Withhold sessions from new accounts until [`Self::confirm_email`].
    #[must_use]
    pub fn with_email_confirmation(mut self, required: bool) -> Self {
        self.require_email_confirmation = required;
        self
    }

    /// Make the next port call fail with a transport error.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.state().armed_failure = Some(message.into());
    }

    /// Confirm an account's e-mail and sign it in, as following the
    /// confirmation link would.
    pub fn confirm_email(&self, email: &str) -> Result<Session, AuthProviderError> {
        let session = {
            let mut state = self.state();
            let account = state
                .accounts
                .get_mut(&email.to_lowercase())
                .ok_or_else(|| AuthProviderError::rejected("no account for this e-mail"))?;
            account.confirmed = true;
            let session = Session {
                user_id: account.user_id,
                email: account.email.clone(),
                created_at: self.clock.utc(),
            };
            state.current = Some(session.clone());
            session
        };
        debug!(user_id = %session.user_id, "e-mail confirmed");
        self.notify(Some(session.clone()));
        Ok(session)
    }

    /// Drop the current session without a client call, as a token expiry
    /// or a sign-out on another device would.
    pub fn expire_session(&self) {
        self.state().current = None;
        self.notify(None);
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, session: Option<Session>) {
        if self.notifications.send(session).is_err() {
            debug!("no session subscribers");
        }
    }

    fn start_session(&self, state: &mut State, user_id: UserId, email: &str) -> Session {
        let session = Session {
            user_id,
            email: email.to_owned(),
            created_at: self.clock.utc(),
        };
        state.current = Some(session.clone());
        session
    }
}

#[async_trait]
impl AuthProvider for InMemoryBlogStore {
    async fn get_session(&self) -> Result<Option<Session>, AuthProviderError> {
        let mut state = self.state();
        if let Some(message) = state.take_failure() {
            return Err(AuthProviderError::transport(message));
        }
        Ok(state.current.clone())
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpResult, AuthProviderError> {
        let result = {
            let mut state = self.state();
            if let Some(message) = state.take_failure() {
                return Err(AuthProviderError::transport(message));
            }
            let credentials = request.credentials();
            let key = credentials.email().to_lowercase();
            if state.accounts.contains_key(&key) {
                return Err(AuthProviderError::constraint_violation(Constraint::Email));
            }
            if state.username_owner(request.username()).is_some() {
                return Err(AuthProviderError::constraint_violation(Constraint::Username));
            }

            let user_id = UserId::random();
            state.accounts.insert(
                key,
                Account {
                    user_id,
                    email: credentials.email().to_owned(),
                    password: Zeroizing::new(credentials.password().to_owned()),
                    confirmed: !self.require_email_confirmation,
                },
            );
            state.profiles.insert(
                user_id,
                Profile {
                    id: user_id,
                    username: request.username().clone(),
                    avatar_url: None,
                    bio: None,
                },
            );
            let session = (!self.require_email_confirmation)
                .then(|| self.start_session(&mut state, user_id, credentials.email()));
            SignUpResult { user_id, session }
        };
        debug!(user_id = %result.user_id, confirmed = result.session.is_some(), "account created");
        if let Some(session) = &result.session {
            self.notify(Some(session.clone()));
        }
        Ok(result)
    }

    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<Session, AuthProviderError> {
        let session = {
            let mut state = self.state();
            if let Some(message) = state.take_failure() {
                return Err(AuthProviderError::transport(message));
            }
            let account = state
                .accounts
                .get(&credentials.email().to_lowercase())
                .filter(|account| account.password.as_str() == credentials.password())
                .ok_or_else(AuthProviderError::invalid_credentials)?;
            if !account.confirmed {
                return Err(AuthProviderError::rejected("e-mail not confirmed"));
            }
            let (user_id, email) = (account.user_id, account.email.clone());
            self.start_session(&mut state, user_id, &email)
        };
        debug!(user_id = %session.user_id, "signed in");
        self.notify(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthProviderError> {
        {
            let mut state = self.state();
            if let Some(message) = state.take_failure() {
                return Err(AuthProviderError::transport(message));
            }
            state.current = None;
        }
        self.notify(None);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Option<Session>> {
        self.notifications.subscribe()
    }
}

#[async_trait]
impl ProfileRepository for InMemoryBlogStore {
    async fn get_profile(&self, id: &UserId) -> Result<Option<Profile>, StoreError> {
        let mut state = self.state();
        if let Some(message) = state.take_failure() {
            return Err(StoreError::transport(message));
        }
        Ok(state.profiles.get(id).cloned())
    }

    async fn find_profile_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Profile>, StoreError> {
        let mut state = self.state();
        if let Some(message) = state.take_failure() {
            return Err(StoreError::transport(message));
        }
        Ok(state
            .profiles
            .values()
            .find(|profile| profile.username == *username)
            .cloned())
    }

    async fn update_profile(
        &self,
        id: &UserId,
        changes: &ProfileChanges,
    ) -> Result<Profile, StoreError> {
        let mut state = self.state();
        if let Some(message) = state.take_failure() {
            return Err(StoreError::transport(message));
        }
        state.require_writer(id)?;
        if state
            .username_owner(&changes.username)
            .is_some_and(|owner| owner != *id)
        {
            debug!(user_id = %id, username = %changes.username, "username already taken");
            return Err(StoreError::constraint_violation(Constraint::Username));
        }
        let profile = state
            .profiles
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(format!("profile {id}")))?;
        *profile = changes.apply_to(profile);
        Ok(profile.clone())
    }
}

#[async_trait]
impl PostRepository for InMemoryBlogStore {
    async fn get_post(&self, id: &PostId) -> Result<Option<Post>, StoreError> {
        let mut state = self.state();
        if let Some(message) = state.take_failure() {
            return Err(StoreError::transport(message));
        }
        Ok(state.posts.get(id).cloned())
    }

    async fn get_post_by_slug(&self, slug: &Slug) -> Result<Option<Post>, StoreError> {
        let mut state = self.state();
        if let Some(message) = state.take_failure() {
            return Err(StoreError::transport(message));
        }
        Ok(state.posts.values().find(|post| post.slug == *slug).cloned())
    }

    async fn list_posts_by_author(
        &self,
        author_id: &UserId,
        scope: ListingScope,
    ) -> Result<Vec<Post>, StoreError> {
        let mut state = self.state();
        if let Some(message) = state.take_failure() {
            return Err(StoreError::transport(message));
        }
        let mut posts: Vec<Post> = state
            .posts
            .values()
            .filter(|post| post.author_id == *author_id)
            .filter(|post| !scope.published_only() || post.is_published)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!(author_id = %author_id, ?scope, rows = posts.len(), "listed posts");
        Ok(posts)
    }

    async fn create_post(&self, write: &PostWrite) -> Result<Post, StoreError> {
        let mut state = self.state();
        if let Some(message) = state.take_failure() {
            return Err(StoreError::transport(message));
        }
        state.require_writer(&write.author_id)?;
        if state.slug_owner(&write.content.slug).is_some() {
            debug!(slug = %write.content.slug, "slug already taken");
            return Err(StoreError::constraint_violation(Constraint::Slug));
        }
        let now = self.clock.utc();
        let post = Post {
            id: PostId::random(),
            author_id: write.author_id,
            title: write.content.title.clone(),
            content: write.content.content.clone(),
            slug: write.content.slug.clone(),
            is_published: write.content.is_published,
            created_at: now,
            updated_at: now,
        };
        state.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update_post(&self, id: &PostId, write: &PostWrite) -> Result<Post, StoreError> {
        let mut state = self.state();
        if let Some(message) = state.take_failure() {
            return Err(StoreError::transport(message));
        }
        let stored_author = state
            .posts
            .get(id)
            .map(|post| post.author_id)
            .ok_or_else(|| StoreError::not_found(format!("post {id}")))?;
        if stored_author != write.author_id {
            return Err(StoreError::rejected("author id cannot change"));
        }
        state.require_writer(&stored_author)?;
        if state
            .slug_owner(&write.content.slug)
            .is_some_and(|owner| owner != *id)
        {
            return Err(StoreError::constraint_violation(Constraint::Slug));
        }
        let now = self.clock.utc();
        let post = state
            .posts
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(format!("post {id}")))?;
        post.title.clone_from(&write.content.title);
        post.content.clone_from(&write.content.content);
        post.slug = write.content.slug.clone();
        post.is_published = write.content.is_published;
        post.updated_at = now;
        Ok(post.clone())
    }

    async fn delete_post(&self, id: &PostId) -> Result<(), StoreError> {
        let mut state = self.state();
        if let Some(message) = state.take_failure() {
            return Err(StoreError::transport(message));
        }
        let author_id = state
            .posts
            .get(id)
            .map(|post| post.author_id)
            .ok_or_else(|| StoreError::not_found(format!("post {id}")))?;
        state.require_writer(&author_id)?;
        state.posts.remove(id);
        debug!(post_id = %id, "post removed");
        Ok(())
    }
}
