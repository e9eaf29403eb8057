mod config;
mod error;
mod lifecycle;
mod memory_store;
#[cfg(feature = "redis_store")]
mod redis_store;
mod sid;
mod store;

use chrono::{DateTime, Utc};
pub use config::{DEFAULT_KEY_PREFIX, DEFAULT_QUERY_PARAM, SessionConfig};
pub use error::SessionError;
pub use lifecycle::{SCHEME_BEARER, SessionManager, authorization_value};
pub use memory_store::InMemorySessionStore;
#[cfg(feature = "redis_store")]
pub use redis_store::RedisSessionStore;
use serde::{Deserialize, Serialize};
pub use sid::{ID_LENGTH, SessionId};
pub use store::SessionStore;

use crate::User;

/// What the gateway keeps per signed-in user.
///
/// Serialized as JSON into the store, e.g.
/// `{"startTime":"2024-01-01T00:00:00Z","user":{...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub start_time: DateTime<Utc>,
    pub user: User,
}

impl SessionState {
    pub fn new(user: User) -> Self {
        Self {
            start_time: Utc::now(),
            user,
        }
    }
}
