//! Edge gateway core: signed session ids, a sliding-TTL session store and an
//! identity-propagating reverse proxy.
//!
//! ```text
//! client ──► api (signup / login / logout) ──► SessionManager ──► SessionStore
//!        └─► proxy ──► SessionManager::get_state ──► X-User header ──► upstream
//! ```
//!
//! Handlers only ever touch sessions through [`session::SessionManager`].

pub mod actions;
pub mod api;
pub mod config;
pub mod crypto;
pub mod proxy;
pub mod repository;
mod secret;
pub mod session;
pub mod validators;

pub use config::GatewayConfig;
pub use proxy::{IdentityProxy, ProxyError, Upstream};
pub use repository::{Credentials, InMemoryUserRepository, NewUser, User, UserRepository};
pub use secret::SecretString;
pub use session::{
    SessionConfig, SessionError, SessionId, SessionManager, SessionState, SessionStore,
};

use validators::ValidationError;

/// Errors returned by account actions and HTTP handlers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthError {
    #[error("User already exists")]
    UserAlreadyExists,
    /// Returned for both an unknown email and a wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Failed to hash password")]
    PasswordHashError,
    #[error("Request body must be of type JSON")]
    UnsupportedMediaType,
    #[error("Malformed request body: {0}")]
    MalformedBody(String),
    #[error("Forbidden")]
    Forbidden,
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error(transparent)]
    Session(#[from] SessionError),
}
