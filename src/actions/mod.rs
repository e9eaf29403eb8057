//! Account actions: the use cases behind the session endpoints.

pub mod login;
pub mod logout;
pub mod signup;

pub use login::LoginAction;
pub use logout::LogoutAction;
pub use signup::SignupAction;

use crate::{SessionId, User};

/// Result of a successful signup or login: the user and their new session.
#[derive(Clone)]
pub struct SignedIn {
    pub user: User,
    pub session_id: SessionId,
    /// Value for the `Authorization` response header.
    pub authorization: String,
}

impl std::fmt::Debug for SignedIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedIn")
            .field("user", &self.user)
            .field("session_id", &self.session_id)
            .field("authorization", &"[REDACTED]")
            .finish()
    }
}
