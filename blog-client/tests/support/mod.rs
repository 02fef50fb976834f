//! Shared harness for integration tests: a fully wired client over the
//! in-memory store with a deterministic clock.
#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use blog_client::domain::{
    AccountService, ChangeListener, PostFields, PostService, ProfileService, Session, SessionCache,
    SessionState, SessionStore, SignUpForm, SignUpOutcome,
};
use blog_client::outbound::memory::InMemoryBlogStore;
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;

pub const PASSWORD: &str = "secret-password";

/// Clock that advances one minute on every reading, starting at midday
/// UTC on 2026-10-18 so derived slugs carry a stable date.
pub struct SteppingClock {
    start: DateTime<Utc>,
    ticks: AtomicI64,
}

impl SteppingClock {
    pub fn new() -> Self {
        Self {
            start: Utc
                .with_ymd_and_hms(2026, 10, 18, 12, 0, 0)
                .single()
                .expect("valid start"),
            ticks: AtomicI64::new(0),
        }
    }
}

impl Clock for SteppingClock {
    fn local(&self) -> DateTime<Local> {
        self.start.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.start + Duration::minutes(tick)
    }
}

pub type Accounts = AccountService<InMemoryBlogStore, InMemoryBlogStore>;
pub type Posts = PostService<InMemoryBlogStore, InMemoryBlogStore>;
pub type Profiles = ProfileService<InMemoryBlogStore>;

/// Every collaborator a client needs, wired the way the binary wires them.
pub struct Client {
    pub clock: Arc<SteppingClock>,
    pub store: Arc<InMemoryBlogStore>,
    pub cache: Arc<SessionCache>,
    pub sessions: Arc<SessionStore<InMemoryBlogStore>>,
    pub accounts: Accounts,
    pub profiles: Profiles,
    pub posts: Posts,
    _listener: ChangeListener,
}

impl Client {
    pub async fn new() -> Self {
        Self::build(false).await
    }

    pub async fn with_email_confirmation() -> Self {
        Self::build(true).await
    }

    async fn build(require_email_confirmation: bool) -> Self {
        let clock = Arc::new(SteppingClock::new());
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let store = Arc::new(
            InMemoryBlogStore::new(dyn_clock).with_email_confirmation(require_email_confirmation),
        );
        let cache = Arc::new(SessionCache::new());
        let sessions = Arc::new(SessionStore::new(Arc::clone(&store), Arc::clone(&cache)));
        let listener = sessions.spawn_change_listener();
        sessions.initialize().await;
        Self {
            accounts: AccountService::new(Arc::clone(&sessions), Arc::clone(&store)),
            profiles: ProfileService::new(Arc::clone(&store), Arc::clone(&cache)),
            posts: PostService::new(Arc::clone(&store), Arc::clone(&store), Arc::clone(&cache)),
            clock,
            store,
            cache,
            sessions,
            _listener: listener,
        }
    }

    /// Register and sign in a new account.
    pub async fn register(&self, username: &str) -> Session {
        let form = sign_up_form(username);
        match self.accounts.sign_up(&form).await.expect("sign-up succeeds") {
            SignUpOutcome::SignedIn(session) => session,
            SignUpOutcome::ConfirmationRequired { .. } => {
                panic!("harness registers without e-mail confirmation")
            }
        }
    }

    /// Sign back in as an existing account.
    pub async fn sign_in(&self, username: &str) -> Session {
        self.accounts
            .sign_in(&email_for(username), PASSWORD)
            .await
            .expect("sign-in succeeds")
    }

    pub async fn sign_out(&self) {
        self.accounts.sign_out().await.expect("sign-out succeeds");
    }

    pub fn current(&self) -> SessionState {
        self.sessions.current()
    }
}

pub fn email_for(username: &str) -> String {
    format!("{username}@example.test")
}

pub fn sign_up_form(username: &str) -> SignUpForm {
    SignUpForm {
        email: email_for(username),
        password: PASSWORD.to_owned(),
        confirm_password: PASSWORD.to_owned(),
        username: username.to_owned(),
    }
}

pub fn fields(title: &str, slug: &str, is_published: bool) -> PostFields {
    PostFields {
        title: title.to_owned(),
        content: format!("Body of {title}"),
        slug: slug.to_owned(),
        is_published,
    }
}
