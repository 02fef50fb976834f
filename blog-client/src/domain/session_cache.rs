//! Session-scoped entity cache.
//!
//! Entries are keyed by `(kind, entity id, owner)`. A lookup hits only when
//! the current session is the recorded owner and the entity identity
//! matches; after a session switch every entry of the previous identity is
//! a miss by construction, so a previous user's profile or draft can never
//! be served to the next one.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;
use uuid::Uuid;

use super::{Post, PostId, Profile, SessionState, UserId};

/// Kinds of entity the cache holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// The signed-in user's own profile.
    Profile,
    /// A post opened for editing.
    PostEdit,
}

/// A cached entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedEntity {
    Profile(Profile),
    Post(Post),
}

impl CachedEntity {
    fn kind(&self) -> EntityKind {
        match self {
            Self::Profile(_) => EntityKind::Profile,
            Self::Post(_) => EntityKind::PostEdit,
        }
    }

    fn entity_id(&self) -> Uuid {
        match self {
            Self::Profile(profile) => *profile.id.as_uuid(),
            Self::Post(post) => *post.id.as_uuid(),
        }
    }

    /// Identity that owns the entity itself.
    fn owned_by(&self) -> &UserId {
        match self {
            Self::Profile(profile) => &profile.id,
            Self::Post(post) => &post.author_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    kind: EntityKind,
    entity_id: Uuid,
    owner: UserId,
}

/// Cache guard shared by the profile and post workflows.
#[derive(Debug, Default)]
pub struct SessionCache {
    entries: Mutex<HashMap<CacheKey, CachedEntity>>,
}

impl SessionCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, CachedEntity>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up an entity for the current session.
    ///
    /// Misses when the session is not authenticated, when it is not the
    /// entry's owner, or when no entry exists for `(kind, entity_id)`.
    #[must_use]
    pub fn get(
        &self,
        kind: EntityKind,
        entity_id: &Uuid,
        session: &SessionState,
    ) -> Option<CachedEntity> {
        let Some(owner) = session.user_id() else {
            debug!(?kind, %entity_id, "cache miss: no authenticated session");
            return None;
        };
        let key = CacheKey {
            kind,
            entity_id: *entity_id,
            owner: *owner,
        };
        let hit = self
            .entries()
            .get(&key)
            .filter(|entity| entity.owned_by() == owner)
            .cloned();
        debug!(?kind, %entity_id, hit = hit.is_some(), "cache lookup");
        hit
    }

    /// Record an entity fetched under `session`.
    ///
    /// Entities the session does not own are never cached; returns whether
    /// the entry was stored.
    pub fn put(&self, session: &SessionState, entity: CachedEntity) -> bool {
        let Some(owner) = session.user_id() else {
            return false;
        };
        if entity.owned_by() != owner {
            debug!(
                kind = ?entity.kind(),
                "refusing to cache an entity the session does not own"
            );
            return false;
        }
        let key = CacheKey {
            kind: entity.kind(),
            entity_id: entity.entity_id(),
            owner: *owner,
        };
        self.entries().insert(key, entity);
        true
    }

    /// The current session's own profile, if cached.
    #[must_use]
    pub fn profile(&self, session: &SessionState) -> Option<Profile> {
        let owner = session.user_id()?;
        match self.get(EntityKind::Profile, owner.as_uuid(), session)? {
            CachedEntity::Profile(profile) => Some(profile),
            CachedEntity::Post(_) => None,
        }
    }

    /// A post being edited by the current session, if cached.
    #[must_use]
    pub fn post(&self, session: &SessionState, post_id: &PostId) -> Option<Post> {
        match self.get(EntityKind::PostEdit, post_id.as_uuid(), session)? {
            CachedEntity::Post(post) => Some(post),
            CachedEntity::Profile(_) => None,
        }
    }

    /// Forget a post for every owner, e.g. after deletion.
    pub fn invalidate_post(&self, post_id: &PostId) {
        self.entries().retain(|key, _| {
            !(key.kind == EntityKind::PostEdit && key.entity_id == *post_id.as_uuid())
        });
    }

    /// Drop every entry not owned by the session in `state`.
    ///
    /// Lookups already miss for other owners; pruning releases the memory
    /// and is applied on every session transition.
    pub fn retain_session(&self, state: &SessionState) {
        let mut entries = self.entries();
        let before = entries.len();
        match state.user_id() {
            Some(owner) => entries.retain(|key, _| &key.owner == owner),
            None => entries.clear(),
        }
        let pruned = before - entries.len();
        if pruned > 0 {
            debug!(pruned, session = %state, "pruned cache entries after session change");
        }
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::{Session, Slug, Username};
    use chrono::Utc;
    use rstest::{fixture, rstest};

    fn signed_in(user_id: UserId) -> SessionState {
        SessionState::Authenticated(Session {
            user_id,
            email: format!("{user_id}@example.test"),
            created_at: Utc::now(),
        })
    }

    fn profile(id: UserId, username: &str) -> Profile {
        Profile {
            id,
            username: Username::new(username).expect("valid username"),
            avatar_url: None,
            bio: None,
        }
    }

    fn post(author_id: UserId) -> Post {
        let now = Utc::now();
        Post {
            id: PostId::random(),
            author_id,
            title: "Draft".to_owned(),
            content: "Body".to_owned(),
            slug: Slug::new("draft-20261018").expect("valid slug"),
            is_published: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[fixture]
    fn cache() -> SessionCache {
        SessionCache::new()
    }

    #[rstest]
    fn owner_gets_a_hit(cache: SessionCache) {
        let alice = UserId::random();
        let session = signed_in(alice);
        assert!(cache.put(&session, CachedEntity::Profile(profile(alice, "alice"))));
        assert_eq!(
            cache.profile(&session).map(|p| p.username.to_string()),
            Some("alice".to_owned())
        );
    }

    #[rstest]
    fn switching_identity_misses_previous_entries(cache: SessionCache) {
        let alice = UserId::random();
        let bob = UserId::random();
        let draft = post(alice);
        let alice_session = signed_in(alice);
        cache.put(&alice_session, CachedEntity::Profile(profile(alice, "alice")));
        cache.put(&alice_session, CachedEntity::Post(draft.clone()));

        let bob_session = signed_in(bob);
        assert!(cache.profile(&bob_session).is_none());
        assert!(cache.post(&bob_session, &draft.id).is_none());
        assert!(
            cache
                .get(EntityKind::Profile, alice.as_uuid(), &bob_session)
                .is_none()
        );
        assert!(cache.post(&SessionState::Anonymous, &draft.id).is_none());
    }

    #[rstest]
    fn different_entity_id_misses(cache: SessionCache) {
        let alice = UserId::random();
        let session = signed_in(alice);
        cache.put(&session, CachedEntity::Post(post(alice)));
        assert!(cache.post(&session, &PostId::random()).is_none());
    }

    #[rstest]
    fn foreign_entities_are_not_cached(cache: SessionCache) {
        let session = signed_in(UserId::random());
        assert!(!cache.put(&session, CachedEntity::Post(post(UserId::random()))));
        let anonymous = SessionState::Anonymous;
        assert!(!cache.put(&anonymous, CachedEntity::Post(post(UserId::random()))));
        assert!(cache.is_empty());
    }

    #[rstest]
    fn retain_session_prunes_other_owners(cache: SessionCache) {
        let alice = UserId::random();
        let bob = UserId::random();
        cache.put(&signed_in(alice), CachedEntity::Profile(profile(alice, "alice")));
        cache.put(&signed_in(bob), CachedEntity::Profile(profile(bob, "bob")));

        cache.retain_session(&signed_in(bob));
        assert_eq!(cache.len(), 1);

        cache.retain_session(&SessionState::Anonymous);
        assert!(cache.is_empty());
    }

    #[rstest]
    fn invalidate_post_removes_entry(cache: SessionCache) {
        let alice = UserId::random();
        let session = signed_in(alice);
        let draft = post(alice);
        cache.put(&session, CachedEntity::Post(draft.clone()));
        cache.invalidate_post(&draft.id);
        assert!(cache.post(&session, &draft.id).is_none());
    }
}
