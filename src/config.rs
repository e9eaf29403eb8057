//! Gateway configuration.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use spectrum_gateway::{GatewayConfig, SessionConfig};
//!
//! let config = GatewayConfig {
//!     upstream: "http://news:4000".to_owned(),
//!     session: SessionConfig::new("a-signing-key-of-at-least-32-bytes!!"),
//!     ..GatewayConfig::default()
//! };
//! assert!(config.validate().is_ok());
//! assert_eq!(config.login_failure_delay, Duration::from_secs(7));
//! ```

use std::time::Duration;

use crate::session::SessionConfig;

/// Name of the header carrying the verified principal to upstream services.
pub const DEFAULT_IDENTITY_HEADER: &str = "X-User";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the content service behind the proxy, e.g. `http://news:4000`.
    pub upstream: String,

    /// Header set on proxied requests. Any inbound copy is always removed.
    ///
    /// Default: `X-User`
    pub identity_header: String,

    /// Path prefixes forwarded to `upstream`.
    ///
    /// Default: `["/v1/news"]`
    pub forwarded_routes: Vec<String>,

    /// Applied to every failed login, whatever the cause.
    ///
    /// Default: 7 seconds
    pub login_failure_delay: Duration,

    /// The only path segment accepted by `DELETE /v1/sessions/{segment}`.
    ///
    /// Default: `mine`
    pub session_termination_segment: String,

    pub session: SessionConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            upstream: "http://127.0.0.1:4000".to_owned(),
            identity_header: DEFAULT_IDENTITY_HEADER.to_owned(),
            forwarded_routes: vec!["/v1/news".to_owned()],
            login_failure_delay: Duration::from_secs(7),
            session_termination_segment: "mine".to_owned(),
            session: SessionConfig::default(),
        }
    }
}

impl GatewayConfig {
    pub fn new(upstream: impl Into<String>, session: SessionConfig) -> Self {
        Self {
            upstream: upstream.into(),
            session,
            ..Self::default()
        }
    }

    /// Local development: no login delay, longer sessions.
    pub fn development() -> Self {
        Self {
            login_failure_delay: Duration::ZERO,
            session: SessionConfig {
                session_ttl: Duration::from_secs(3600),
                ..SessionConfig::default()
            },
            ..Self::default()
        }
    }

    /// Shorter sessions and a tighter store timeout.
    pub fn strict() -> Self {
        Self {
            login_failure_delay: Duration::from_secs(10),
            session: SessionConfig {
                session_ttl: Duration::from_secs(60),
                store_timeout: Duration::from_millis(500),
                ..SessionConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        self.session.validate()?;

        if self.upstream.is_empty() {
            return Err("upstream must not be empty");
        }
        if axum::http::HeaderName::from_bytes(self.identity_header.as_bytes()).is_err() {
            return Err("identity_header is not a valid header name");
        }
        if self
            .forwarded_routes
            .iter()
            .any(|route| !route.starts_with('/'))
        {
            return Err("forwarded_routes must start with '/'");
        }
        if self.session_termination_segment.is_empty()
            || self.session_termination_segment.contains('/')
        {
            return Err("session_termination_segment must be a single path segment");
        }
        Ok(())
    }
}
