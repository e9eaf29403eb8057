//! In-memory session storage.
//!
//! Suitable for development, tests and single-instance deployments.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::store::SessionStore;
use super::{SessionError, SessionId};

struct Entry {
    state: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-memory session storage.
///
/// Entries live in a `HashMap` behind a `RwLock`. Reads take the write lock
/// so that checking the deadline and pushing it forward cannot interleave
/// with another writer. Deadlines use the tokio clock, so tests can drive
/// expiry with `tokio::time::pause` and `advance`.
///
/// Every `save` sweeps expired entries, so sessions that are never read
/// again do not accumulate. The sweep is linear in the number of entries;
/// production deployments use the Redis store. Sessions are lost when the
/// process restarts.
#[derive(Clone)]
pub struct InMemorySessionStore {
    entries: Arc<RwLock<HashMap<SessionId, Entry>>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Number of entries held, including expired ones not yet pruned.
    pub fn len(&self) -> usize {
        self.entries.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops entries past their deadline. Returns how many were removed.
    ///
    /// Expired entries are already invisible to `get`; this only reclaims memory.
    pub fn prune_expired(&self) -> Result<usize, SessionError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        Ok(before.saturating_sub(entries.len()))
    }
}

fn poisoned() -> SessionError {
    SessionError::StoreUnavailable("lock poisoned".to_owned())
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, id: &SessionId, state: &str) -> Result<(), SessionError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let now = Instant::now();
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(
            id.clone(),
            Entry {
                state: state.to_owned(),
                expires_at: now + self.ttl,
            },
        );
        Ok(())
    }

    #[allow(clippy::significant_drop_tightening)]
    async fn get(&self, id: &SessionId) -> Result<String, SessionError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let now = Instant::now();

        let Some(entry) = entries.get_mut(id) else {
            return Err(SessionError::StateNotFound);
        };
        if entry.is_live(now) {
            entry.expires_at = now + self.ttl;
            return Ok(entry.state.clone());
        }

        entries.remove(id);
        Err(SessionError::StateNotFound)
    }

    async fn delete(&self, id: &SessionId) -> Result<(), SessionError> {
        self.entries.write().map_err(|_| poisoned())?.remove(id);
        Ok(())
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use futures::future::join_all;

    use super::*;
    use crate::SecretString;

    const TTL: Duration = Duration::from_secs(150);

    fn new_id() -> SessionId {
        SessionId::new(&SecretString::new("test-secret-key-that-is-long-enough")).unwrap()
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let store = InMemorySessionStore::new(TTL);
        let id = new_id();

        store.save(&id, r#"{"user":"alice"}"#).await.unwrap();

        assert_eq!(store.get(&id).await.unwrap(), r#"{"user":"alice"}"#);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = InMemorySessionStore::new(TTL);
        let id = new_id();

        store.save(&id, "first").await.unwrap();
        store.save(&id, "second").await.unwrap();

        assert_eq!(store.get(&id).await.unwrap(), "second");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = InMemorySessionStore::new(TTL);
        assert_eq!(
            store.get(&new_id()).await,
            Err(SessionError::StateNotFound)
        );
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = InMemorySessionStore::new(TTL);
        let id = new_id();

        store.save(&id, "state").await.unwrap();
        store.delete(&id).await.unwrap();
        store.delete(&id).await.unwrap();
        store.delete(&new_id()).await.unwrap();

        assert!(store.is_empty());
        assert_eq!(store.get(&id).await, Err(SessionError::StateNotFound));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expires_after_ttl() {
        let store = InMemorySessionStore::new(TTL);
        let id = new_id();
        store.save(&id, "state").await.unwrap();

        tokio::time::advance(TTL + Duration::from_millis(1)).await;

        assert_eq!(store.get(&id).await, Err(SessionError::StateNotFound));
        // the expired entry is dropped on access
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_slides_the_deadline() {
        let store = InMemorySessionStore::new(TTL);
        let id = new_id();
        store.save(&id, "state").await.unwrap();

        // just before the original deadline
        tokio::time::advance(TTL - Duration::from_secs(1)).await;
        assert!(store.get(&id).await.is_ok());

        // past the original deadline, inside the refreshed one
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(store.get(&id).await.unwrap(), "state");

        // no access for a full ttl
        tokio::time::advance(TTL + Duration::from_secs(1)).await;
        assert_eq!(store.get(&id).await, Err(SessionError::StateNotFound));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_not_revived_by_save_of_other_id() {
        let store = InMemorySessionStore::new(TTL);
        let expired = new_id();
        store.save(&expired, "old").await.unwrap();

        tokio::time::advance(TTL * 2).await;
        store.save(&new_id(), "new").await.unwrap();

        assert_eq!(store.get(&expired).await, Err(SessionError::StateNotFound));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_expired() {
        let store = InMemorySessionStore::new(TTL);
        store.save(&new_id(), "a").await.unwrap();
        store.save(&new_id(), "b").await.unwrap();

        tokio::time::advance(TTL / 2).await;
        let live = new_id();
        store.save(&live, "c").await.unwrap();
        tokio::time::advance(TTL / 2).await;

        assert_eq!(store.prune_expired().unwrap(), 2);
        assert_eq!(store.len(), 1);
        assert!(store.get(&live).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_sweeps_abandoned_sessions() {
        let store = InMemorySessionStore::new(TTL);
        for _ in 0..3 {
            store.save(&new_id(), "abandoned").await.unwrap();
        }
        assert_eq!(store.len(), 3);

        tokio::time::advance(TTL).await;
        store.save(&new_id(), "fresh").await.unwrap();

        assert_eq!(store.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_keep_their_own_state() {
        let store = InMemorySessionStore::new(TTL);
        let ids: Vec<SessionId> = (0..64).map(|_| new_id()).collect();

        let saves = ids.iter().enumerate().map(|(i, id)| {
            let store = store.clone();
            let id = id.clone();
            tokio::spawn(async move { store.save(&id, &format!("state-{i}")).await })
        });
        for result in join_all(saves).await {
            result.unwrap().unwrap();
        }

        for (i, id) in ids.iter().enumerate() {
            assert_eq!(store.get(id).await.unwrap(), format!("state-{i}"));
        }
    }
}
