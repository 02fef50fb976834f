//! Profile workflows.

use std::sync::Arc;

use tracing::info;

use super::authorization::{Requirement, authorize};
use super::ports::ProfileRepository;
use super::session_cache::CachedEntity;
use super::store_mapping::map_store_error;
use super::{
    Error, ErrorCode, Profile, ProfileChanges, ProfileForm, SessionCache, SessionState, UserId,
    Username,
};

/// Loads and updates profiles under the session cache guard.
pub struct ProfileService<P: ?Sized> {
    profiles: Arc<P>,
    cache: Arc<SessionCache>,
}

impl<P> ProfileService<P>
where
    P: ProfileRepository + ?Sized,
{
    /// Create a service sharing `cache` with the session store.
    pub fn new(profiles: Arc<P>, cache: Arc<SessionCache>) -> Self {
        Self { profiles, cache }
    }

    /// Load the signed-in user's profile, preferring the cache.
    pub async fn load_own_profile(&self, session: &SessionState) -> Result<Profile, Error> {
        let owner = authorize(session, Requirement::Identity)?.user_id;
        if let Some(profile) = self.cache.profile(session) {
            return Ok(profile);
        }
        let profile = self
            .profiles
            .get_profile(&owner)
            .await
            .map_err(|err| map_store_error("loading profile", err))?
            .ok_or_else(|| Error::not_found(format!("profile {owner} not found")))?;
        self.cache.put(session, CachedEntity::Profile(profile.clone()));
        Ok(profile)
    }

    /// Public lookup by username.
    pub async fn profile_by_username(&self, username: &str) -> Result<Profile, Error> {
        let Ok(username) = Username::new(username) else {
            return Err(Error::not_found(format!("no profile named `{username}`")));
        };
        self.profiles
            .find_profile_by_username(&username)
            .await
            .map_err(|err| map_store_error("looking up profile", err))?
            .ok_or_else(|| Error::not_found(format!("no profile named `{username}`")))
    }

    /// Update `target`'s profile.
    ///
    /// Validation and authorization run before the store is contacted; a
    /// username owned by someone else yields `UsernameTaken` and leaves
    /// the cached profile untouched.
    pub async fn update_profile(
        &self,
        session: &SessionState,
        target: &UserId,
        form: &ProfileForm,
    ) -> Result<Profile, Error> {
        let changes = ProfileChanges::try_from_form(form)
            .map_err(|err| Error::validation("username", err.reason(), err.to_string()))?;
        authorize(session, Requirement::OwnerOf(target))?;

        let updated = self
            .profiles
            .update_profile(target, &changes)
            .await
            .map_err(|err| match map_store_error("updating profile", err) {
                taken if taken.code() == ErrorCode::UsernameTaken => {
                    Error::username_taken(changes.username.as_ref())
                }
                other => other,
            })?;
        self.cache.put(session, CachedEntity::Profile(updated.clone()));
        info!(user_id = %target, username = %updated.username, "profile updated");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::{Constraint, MockProfileRepository, StoreError};
    use crate::domain::Session;
    use chrono::Utc;
    use mockall::predicate::eq;
    use rstest::rstest;

    fn signed_in(user_id: UserId) -> SessionState {
        SessionState::Authenticated(Session {
            user_id,
            email: "ada@example.test".to_owned(),
            created_at: Utc::now(),
        })
    }

    fn profile(id: UserId, username: &str) -> Profile {
        Profile {
            id,
            username: Username::new(username).expect("valid username"),
            avatar_url: None,
            bio: Some("hello".to_owned()),
        }
    }

    fn service(repo: MockProfileRepository) -> ProfileService<MockProfileRepository> {
        ProfileService::new(Arc::new(repo), Arc::new(SessionCache::new()))
    }

    #[rstest]
    #[tokio::test]
    async fn own_profile_is_fetched_once_then_cached() {
        let owner = UserId::random();
        let mut repo = MockProfileRepository::new();
        repo.expect_get_profile()
            .with(eq(owner))
            .times(1)
            .return_once(move |_| Ok(Some(profile(owner, "ada"))));
        let service = service(repo);
        let session = signed_in(owner);

        let first = service.load_own_profile(&session).await.expect("fetched");
        let second = service.load_own_profile(&session).await.expect("cached");

        assert_eq!(first, second);
    }

    #[rstest]
    #[tokio::test]
    async fn anonymous_sessions_cannot_load_own_profile() {
        let mut repo = MockProfileRepository::new();
        repo.expect_get_profile().never();

        let err = service(repo)
            .load_own_profile(&SessionState::Anonymous)
            .await
            .expect_err("anonymous");

        assert_eq!(err.code(), ErrorCode::Unauthenticated);
    }

    #[rstest]
    #[tokio::test]
    async fn taken_username_leaves_cached_profile_unchanged() {
        let owner = UserId::random();
        let mut repo = MockProfileRepository::new();
        repo.expect_get_profile()
            .times(1)
            .return_once(move |_| Ok(Some(profile(owner, "ada"))));
        repo.expect_update_profile()
            .times(1)
            .return_once(|_, _| Err(StoreError::constraint_violation(Constraint::Username)));
        let service = service(repo);
        let session = signed_in(owner);
        let before = service.load_own_profile(&session).await.expect("loaded");

        let form = ProfileForm {
            username: "grace".to_owned(),
            ..ProfileForm::from(&before)
        };
        let err = service
            .update_profile(&session, &owner, &form)
            .await
            .expect_err("taken");

        assert_eq!(err.code(), ErrorCode::UsernameTaken);
        assert!(err.message().contains("grace"));
        let after = service.load_own_profile(&session).await.expect("cached");
        assert_eq!(after, before);
    }

    #[rstest]
    #[case::invalid_chars("bad name!")]
    #[case::empty("")]
    #[tokio::test]
    async fn invalid_usernames_never_reach_the_store(#[case] username: &str) {
        let owner = UserId::random();
        let mut repo = MockProfileRepository::new();
        repo.expect_update_profile().never();
        let form = ProfileForm {
            username: username.to_owned(),
            ..ProfileForm::default()
        };

        let err = service(repo)
            .update_profile(&signed_in(owner), &owner, &form)
            .await
            .expect_err("invalid");

        assert_eq!(err.code(), ErrorCode::ValidationFailed);
    }

    #[rstest]
    #[tokio::test]
    async fn updating_someone_elses_profile_is_forbidden() {
        let mut repo = MockProfileRepository::new();
        repo.expect_update_profile().never();
        let form = ProfileForm {
            username: "mallory".to_owned(),
            ..ProfileForm::default()
        };

        let err = service(repo)
            .update_profile(&signed_in(UserId::random()), &UserId::random(), &form)
            .await
            .expect_err("forbidden");

        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[rstest]
    #[tokio::test]
    async fn successful_update_refreshes_cache() {
        let owner = UserId::random();
        let mut repo = MockProfileRepository::new();
        repo.expect_update_profile()
            .times(1)
            .returning(move |_, changes| Ok(changes.apply_to(&profile(owner, "ada"))));
        repo.expect_get_profile().never();
        let service = service(repo);
        let session = signed_in(owner);
        let form = ProfileForm {
            username: "张三_01".to_owned(),
            avatar_url: "  ".to_owned(),
            bio: "hi".to_owned(),
        };

        let updated = service
            .update_profile(&session, &owner, &form)
            .await
            .expect("updated");
        let cached = service.load_own_profile(&session).await.expect("cached");

        assert_eq!(updated.username.as_ref(), "张三_01");
        assert_eq!(updated.avatar_url, None);
        assert_eq!(cached, updated);
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_username_is_not_found() {
        let mut repo = MockProfileRepository::new();
        repo.expect_find_profile_by_username()
            .return_once(|_| Ok(None));

        let err = service(repo)
            .profile_by_username("nobody")
            .await
            .expect_err("missing");

        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
