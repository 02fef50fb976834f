//! Session store: the single owner of the client's authentication state.
//!
//! The store is created once and handed to every dependent explicitly. It
//! starts `Unknown`, resolves through [`SessionStore::initialize`], and from
//! then on changes only on successful sign-in, sign-up, or sign-out, or
//! when the provider reports an external change. Each transition prunes the
//! session cache of entries owned by other identities.
//!
//! Direct calls and provider notifications are applied one at a time. The
//! provider also reports the client's own sign-ins and sign-outs, so the
//! relay skips to the newest buffered notification before applying it;
//! replaying superseded ones would briefly restore identities that have
//! already signed out.

use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::ports::AuthProvider;
use super::store_mapping::map_provider_error;
use super::{Credentials, Error, Session, SessionCache, SessionState, SignUpRequest, UserId};

/// Result of a successful sign-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The provider issued a session straight away.
    SignedIn(Session),
    /// The account exists but must confirm its e-mail before signing in.
    ConfirmationRequired { user_id: UserId },
}

/// Scoped view of session changes. Dropping it unsubscribes.
#[derive(Debug)]
pub struct SessionSubscription {
    receiver: watch::Receiver<SessionState>,
}

impl SessionSubscription {
    /// Latest state seen by this subscription.
    #[must_use]
    pub fn current(&self) -> SessionState {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change and return the new state.
    ///
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<SessionState> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Whether a change is waiting that [`Self::changed`] has not returned.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }
}

/// Background task relaying provider notifications into the store.
///
/// The task is aborted when the handle is dropped.
#[derive(Debug)]
pub struct ChangeListener {
    handle: JoinHandle<()>,
}

impl ChangeListener {
    /// Whether the relay task has stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ChangeListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Owner of the current [`SessionState`].
pub struct SessionStore<A: ?Sized> {
    provider: Arc<A>,
    cache: Arc<SessionCache>,
    state: watch::Sender<SessionState>,
    serial: Mutex<()>,
}

impl<A> SessionStore<A>
where
    A: AuthProvider + ?Sized + 'static,
{
    /// Create a store in the `Unknown` state.
    pub fn new(provider: Arc<A>, cache: Arc<SessionCache>) -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);
        Self {
            provider,
            cache,
            state,
            serial: Mutex::new(()),
        }
    }

    /// The session cache this store prunes on every transition.
    #[must_use]
    pub fn cache(&self) -> &Arc<SessionCache> {
        &self.cache
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            receiver: self.state.subscribe(),
        }
    }

    /// Wait until the state is no longer `Unknown` and return it.
    pub async fn settled(&self) -> SessionState {
        let mut receiver = self.state.subscribe();
        match receiver.wait_for(SessionState::is_settled).await {
            Ok(state) => state.clone(),
            Err(_) => self.current(),
        }
    }

    /// Ask the provider for its current session and resolve the state.
    ///
    /// A provider failure resolves to `Anonymous` so gated operations never
    /// wait forever.
    pub async fn initialize(&self) -> SessionState {
        let _serial = self.serial.lock().await;
        let next = match self.provider.get_session().await {
            Ok(session) => SessionState::from_session(session),
            Err(error) => {
                warn!(%error, "initial session query failed; continuing anonymously");
                SessionState::Anonymous
            }
        };
        self.transition(next.clone(), "initialize");
        next
    }

    /// Sign in with e-mail and password.
    ///
    /// The state is untouched on failure.
    ///
    /// # Errors
    /// Returns [`ErrorCode::Unauthenticated`](super::ErrorCode::Unauthenticated)
    /// for rejected credentials and
    /// [`ErrorCode::Transient`](super::ErrorCode::Transient) when the provider
    /// cannot be reached.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Session, Error> {
        let _serial = self.serial.lock().await;
        let session = self
            .provider
            .sign_in_with_password(credentials)
            .await
            .map_err(|err| map_provider_error("signing in", err))?;
        self.transition(SessionState::Authenticated(session.clone()), "sign_in");
        Ok(session)
    }

    /// Create an account; signs the user in when the provider issues a session.
    ///
    /// # Errors
    /// Returns [`ErrorCode::UsernameTaken`](super::ErrorCode::UsernameTaken) or
    /// a validation error when the provider reports a taken username or
    /// e-mail, and [`ErrorCode::Transient`](super::ErrorCode::Transient) for
    /// other provider failures. The state is untouched on failure.
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, Error> {
        let _serial = self.serial.lock().await;
        let result = self
            .provider
            .sign_up(request)
            .await
            .map_err(|err| map_provider_error("signing up", err))?;
        match result.session {
            Some(session) => {
                self.transition(SessionState::Authenticated(session.clone()), "sign_up");
                Ok(SignUpOutcome::SignedIn(session))
            }
            None => {
                info!(user_id = %result.user_id, "account created; awaiting e-mail confirmation");
                Ok(SignUpOutcome::ConfirmationRequired {
                    user_id: result.user_id,
                })
            }
        }
    }

    /// End the current session.
    ///
    /// # Errors
    /// Returns [`ErrorCode::Transient`](super::ErrorCode::Transient) when the
    /// provider fails; the session is kept.
    pub async fn sign_out(&self) -> Result<(), Error> {
        let _serial = self.serial.lock().await;
        self.provider
            .sign_out()
            .await
            .map_err(|err| map_provider_error("signing out", err))?;
        self.transition(SessionState::Anonymous, "sign_out");
        Ok(())
    }

    /// Apply a session change reported by the provider.
    pub async fn apply_external(&self, session: Option<Session>) {
        let _serial = self.serial.lock().await;
        self.transition(SessionState::from_session(session), "provider");
    }

    /// Relay provider notifications into this store until the returned
    /// listener is dropped.
    #[must_use]
    pub fn spawn_change_listener(self: &Arc<Self>) -> ChangeListener {
        let mut notifications = self.provider.subscribe();
        let store = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                let first = match notifications.recv().await {
                    Ok(session) => session,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "session notifications lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let _serial = store.serial.lock().await;
                let (latest, closed) = newest_notification(&mut notifications, first);
                store.transition(SessionState::from_session(latest), "provider");
                if closed {
                    break;
                }
            }
            debug!("session notifications closed");
        });
        ChangeListener { handle }
    }

    /// Subscribers are only woken when the state actually changes; the
    /// provider echoes the client's own sign-in and sign-out back through
    /// its notifications.
    fn transition(&self, next: SessionState, cause: &'static str) {
        self.cache.retain_session(&next);
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            let previous = std::mem::replace(current, next);
            info!(from = %previous, to = %current, cause, "session changed");
            true
        });
        if !changed {
            debug!(cause, "session unchanged");
        }
    }
}

/// Drain everything already buffered and keep the newest notification.
///
/// Also reports whether the provider closed the channel.
fn newest_notification(
    notifications: &mut broadcast::Receiver<Option<Session>>,
    first: Option<Session>,
) -> (Option<Session>, bool) {
    let mut latest = first;
    loop {
        match notifications.try_recv() {
            Ok(session) => latest = session,
            Err(TryRecvError::Lagged(skipped)) => {
                debug!(skipped, "session notifications lagged");
            }
            Err(TryRecvError::Empty) => return (latest, false),
            Err(TryRecvError::Closed) => return (latest, true),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::{AuthProviderError, MockAuthProvider, SignUpResult};
    use crate::domain::{ErrorCode, SignUpForm};
    use chrono::Utc;
    use rstest::rstest;

    fn session(user_id: UserId) -> Session {
        Session {
            user_id,
            email: "ada@example.test".to_owned(),
            created_at: Utc::now(),
        }
    }

    fn store(provider: MockAuthProvider) -> SessionStore<MockAuthProvider> {
        SessionStore::new(Arc::new(provider), Arc::new(SessionCache::new()))
    }

    fn credentials() -> Credentials {
        credentials_for("ada")
    }

    fn credentials_for(name: &str) -> Credentials {
        Credentials::try_from_parts(&format!("{name}@example.test"), "secret1")
            .expect("valid credentials")
    }

    async fn let_listener_run() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    fn sign_up_request() -> SignUpRequest {
        let form = SignUpForm {
            email: "ada@example.test".to_owned(),
            password: "secret1".to_owned(),
            confirm_password: "secret1".to_owned(),
            username: "ada".to_owned(),
        };
        SignUpRequest::try_from_form(&form, 6).expect("valid form")
    }

    #[rstest]
    #[tokio::test]
    async fn starts_unknown() {
        let store = store(MockAuthProvider::new());
        assert_eq!(store.current(), SessionState::Unknown);
    }

    #[rstest]
    #[tokio::test]
    async fn initialize_adopts_provider_session() {
        let user_id = UserId::random();
        let mut provider = MockAuthProvider::new();
        provider
            .expect_get_session()
            .times(1)
            .return_once(move || Ok(Some(session(user_id))));
        let store = store(provider);

        let state = store.initialize().await;

        assert!(state.is_user(&user_id));
        assert_eq!(store.current(), state);
    }

    #[rstest]
    #[tokio::test]
    async fn initialize_failure_resolves_to_anonymous() {
        let mut provider = MockAuthProvider::new();
        provider
            .expect_get_session()
            .return_once(|| Err(AuthProviderError::transport("offline")));
        let store = store(provider);

        assert_eq!(store.initialize().await, SessionState::Anonymous);
    }

    #[rstest]
    #[tokio::test]
    async fn settled_waits_for_initialize() {
        let mut provider = MockAuthProvider::new();
        provider.expect_get_session().return_once(|| Ok(None));
        let store = Arc::new(store(provider));

        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.settled().await })
        };
        store.initialize().await;

        let state = waiter.await.expect("waiter completes");
        assert_eq!(state, SessionState::Anonymous);
    }

    #[rstest]
    #[tokio::test]
    async fn failed_sign_in_leaves_state_unchanged() {
        let mut provider = MockAuthProvider::new();
        provider
            .expect_sign_in_with_password()
            .times(1)
            .return_once(|_| Err(AuthProviderError::invalid_credentials()));
        let store = store(provider);
        store.apply_external(None).await;

        let err = store.sign_in(&credentials()).await.expect_err("rejected");

        assert_eq!(err.code(), ErrorCode::Unauthenticated);
        assert_eq!(store.current(), SessionState::Anonymous);
    }

    #[rstest]
    #[tokio::test]
    async fn sign_in_notifies_subscribers() {
        let user_id = UserId::random();
        let mut provider = MockAuthProvider::new();
        provider
            .expect_sign_in_with_password()
            .return_once(move |_| Ok(session(user_id)));
        let store = store(provider);
        let mut subscription = store.subscribe();

        store.sign_in(&credentials()).await.expect("signed in");

        let seen = subscription.changed().await.expect("store alive");
        assert!(seen.is_user(&user_id));
    }

    #[rstest]
    #[tokio::test]
    async fn sign_up_without_session_requires_confirmation() {
        let user_id = UserId::random();
        let mut provider = MockAuthProvider::new();
        provider.expect_sign_up().return_once(move |_| {
            Ok(SignUpResult {
                user_id,
                session: None,
            })
        });
        let store = store(provider);
        store.apply_external(None).await;

        let outcome = store.sign_up(&sign_up_request()).await.expect("signed up");

        assert_eq!(outcome, SignUpOutcome::ConfirmationRequired { user_id });
        assert_eq!(store.current(), SessionState::Anonymous);
    }

    #[rstest]
    #[tokio::test]
    async fn failed_sign_out_keeps_session() {
        let user_id = UserId::random();
        let mut provider = MockAuthProvider::new();
        provider
            .expect_sign_out()
            .return_once(|| Err(AuthProviderError::transport("offline")));
        let store = store(provider);
        store.apply_external(Some(session(user_id))).await;

        let err = store.sign_out().await.expect_err("offline");

        assert_eq!(err.code(), ErrorCode::Transient);
        assert!(store.current().is_user(&user_id));
    }

    #[rstest]
    #[tokio::test]
    async fn change_listener_applies_provider_notifications() {
        let user_id = UserId::random();
        let (sender, _) = broadcast::channel(4);
        let receiver = sender.subscribe();
        let mut provider = MockAuthProvider::new();
        provider.expect_subscribe().return_once(move || receiver);
        let store = Arc::new(store(provider));
        let mut subscription = store.subscribe();
        let _listener = store.spawn_change_listener();

        sender.send(Some(session(user_id))).expect("listener subscribed");

        let seen = subscription.changed().await.expect("store alive");
        assert!(seen.is_user(&user_id));
    }

    #[rstest]
    #[tokio::test]
    async fn own_call_echoes_do_not_replay_earlier_identities() {
        let ada = UserId::random();
        let grace = UserId::random();
        let (sender, receiver) = broadcast::channel(8);
        let mut provider = MockAuthProvider::new();
        provider.expect_subscribe().return_once(move || receiver);
        let sign_in_echo = sender.clone();
        provider
            .expect_sign_in_with_password()
            .times(2)
            .returning(move |credentials| {
                let user_id = if credentials.email().starts_with("ada") {
                    ada
                } else {
                    grace
                };
                let issued = session(user_id);
                sign_in_echo
                    .send(Some(issued.clone()))
                    .expect("listener subscribed");
                Ok(issued)
            });
        let sign_out_echo = sender.clone();
        provider.expect_sign_out().times(1).returning(move || {
            sign_out_echo.send(None).expect("listener subscribed");
            Ok(())
        });
        let store = Arc::new(store(provider));
        let _listener = store.spawn_change_listener();

        store.sign_in(&credentials_for("ada")).await.expect("ada");
        store.sign_out().await.expect("signed out");
        store.sign_in(&credentials_for("grace")).await.expect("grace");
        let subscription = store.subscribe();
        let_listener_run().await;

        assert!(!subscription.has_changed());
        assert!(store.current().is_user(&grace));
    }

    #[rstest]
    #[tokio::test]
    async fn listener_stops_when_provider_closes() {
        let (sender, receiver) = broadcast::channel::<Option<Session>>(4);
        let mut provider = MockAuthProvider::new();
        provider.expect_subscribe().return_once(move || receiver);
        let store = Arc::new(store(provider));
        let listener = store.spawn_change_listener();

        drop(sender);
        for _ in 0..50 {
            if listener.is_finished() {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert!(listener.is_finished());
        assert_eq!(store.current(), SessionState::Unknown);
    }
}
