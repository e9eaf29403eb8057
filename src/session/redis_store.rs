//! Redis-backed session storage.
//!
//! Entries are plain string keys `"{prefix}{session id}"` holding the JSON
//! state, with a native Redis TTL. Expiry is enforced entirely by Redis.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, RedisError};

use super::config::DEFAULT_KEY_PREFIX;
use super::store::SessionStore;
use super::{SessionError, SessionId};

/// Session storage backed by a Redis server.
///
/// `get` runs `GET` and `EXPIRE` inside one `MULTI`/`EXEC` transaction, so a
/// key that Redis has already expired stays gone (`EXPIRE` on a missing key
/// is a no-op) and a live key cannot lapse between the read and the refresh.
///
/// The connection is a [`ConnectionManager`], which multiplexes requests
/// and reconnects on failure; cloning the store is cheap.
///
/// # Example
///
/// ```rust,ignore
/// use std::time::Duration;
/// use spectrum_gateway::session::RedisSessionStore;
///
/// let store = RedisSessionStore::connect("redis://127.0.0.1:6379", Duration::from_secs(150)).await?;
/// ```
#[derive(Clone)]
pub struct RedisSessionStore {
    connection: ConnectionManager,
    ttl: Duration,
    key_prefix: String,
}

impl RedisSessionStore {
    /// Opens a managed connection to `url` and verifies it with `PING`.
    pub async fn connect(url: &str, ttl: Duration) -> Result<Self, SessionError> {
        let client = Client::open(url).map_err(unavailable)?;
        let connection = ConnectionManager::new(client).await.map_err(unavailable)?;
        let store = Self::new(connection, ttl);
        store.ping().await?;

        log::info!(
            target: "spectrum_gateway::session",
            "msg=\"connected to redis session store\" ttl_secs={}",
            ttl.as_secs()
        );
        Ok(store)
    }

    pub fn new(connection: ConnectionManager, ttl: Duration) -> Self {
        Self {
            connection,
            ttl,
            key_prefix: DEFAULT_KEY_PREFIX.to_owned(),
        }
    }

    /// Overrides the `sid:` namespace, e.g. to share one Redis between gateways.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub async fn ping(&self) -> Result<(), SessionError> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    fn key(&self, id: &SessionId) -> String {
        id.store_key(&self.key_prefix)
    }

    fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs().max(1)
    }
}

fn unavailable(err: RedisError) -> SessionError {
    SessionError::StoreUnavailable(err.to_string())
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn save(&self, id: &SessionId, state: &str) -> Result<(), SessionError> {
        let mut conn = self.connection.clone();
        let _: () = redis::cmd("SET")
            .arg(self.key(id))
            .arg(state)
            .arg("EX")
            .arg(self.ttl_secs())
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn get(&self, id: &SessionId) -> Result<String, SessionError> {
        let key = self.key(id);
        let mut conn = self.connection.clone();

        let (state, _refreshed): (Option<String>, bool) = redis::pipe()
            .atomic()
            .cmd("GET")
            .arg(&key)
            .cmd("EXPIRE")
            .arg(&key)
            .arg(self.ttl_secs())
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        state.ok_or(SessionError::StateNotFound)
    }

    async fn delete(&self, id: &SessionId) -> Result<(), SessionError> {
        let mut conn = self.connection.clone();
        let _: () = redis::cmd("DEL")
            .arg(self.key(id))
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}
