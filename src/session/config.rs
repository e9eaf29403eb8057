use std::time::Duration;

use crate::SecretString;

/// Prefix applied to every session key in a shared key/value store.
pub const DEFAULT_KEY_PREFIX: &str = "sid:";

/// Query-string parameter consulted when no `Authorization` header is sent.
pub const DEFAULT_QUERY_PARAM: &str = "auth";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// HMAC key for signing session ids. Immutable for the life of the process.
    pub signing_key: SecretString,
    /// Sliding expiry applied on every save and every successful read.
    pub session_ttl: Duration,
    /// Upper bound on a single store round trip. Exceeding it is reported
    /// as a store outage, never as a missing session.
    pub store_timeout: Duration,
    pub key_prefix: String,
    pub query_param: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            signing_key: SecretString::new(""),
            session_ttl: Duration::from_secs(150),
            store_timeout: Duration::from_secs(2),
            key_prefix: DEFAULT_KEY_PREFIX.to_owned(),
            query_param: DEFAULT_QUERY_PARAM.to_owned(),
        }
    }
}

impl SessionConfig {
    pub fn new(signing_key: impl Into<SecretString>) -> Self {
        Self {
            signing_key: signing_key.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.signing_key.is_empty() {
            return Err("signing_key must not be empty");
        }
        if self.signing_key.len() < 32 {
            return Err("signing_key should be at least 32 bytes");
        }
        if self.session_ttl.as_secs() == 0 {
            return Err("session_ttl must be at least one second");
        }
        if self.store_timeout.is_zero() {
            return Err("store_timeout must be greater than zero");
        }
        if self.query_param.is_empty() {
            return Err("query_param must not be empty");
        }
        Ok(())
    }
}
