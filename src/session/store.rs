//! Session store trait.

use std::time::Duration;

use async_trait::async_trait;

use super::{SessionError, SessionId};

/// Storage for serialized session state with a sliding expiry.
///
/// Implementations:
/// - [`InMemorySessionStore`](super::InMemorySessionStore): single-process storage for tests
/// - [`RedisSessionStore`](super::RedisSessionStore): Redis with native key TTLs
///
/// Only [`SessionManager`](super::SessionManager) should call these methods.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stores `state` under `id` with a fresh TTL, replacing any prior entry.
    async fn save(&self, id: &SessionId, state: &str) -> Result<(), SessionError>;

    /// Returns the state for `id` and restarts its TTL.
    ///
    /// The read and the refresh happen as one operation: an entry that has
    /// already expired is never extended, and a live one cannot expire
    /// between the two. Missing and expired entries both yield
    /// [`SessionError::StateNotFound`].
    async fn get(&self, id: &SessionId) -> Result<String, SessionError>;

    /// Removes the entry for `id`. Deleting a missing entry succeeds.
    async fn delete(&self, id: &SessionId) -> Result<(), SessionError>;

    /// The expiry applied on save and on every successful get.
    fn ttl(&self) -> Duration;
}
