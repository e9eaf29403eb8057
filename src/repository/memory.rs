use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::user::{User, UserRepository};
use crate::AuthError;

/// Process-local user storage.
///
/// Ids are assigned sequentially from 1. Emails are unique, compared
/// case-insensitively.
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<Mutex<Vec<User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.lock().map(|users| users.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> AuthError {
    AuthError::DatabaseError("user store lock poisoned".to_owned())
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let users = self.users.lock().map_err(|_| poisoned())?;
        Ok(users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email.trim()))
            .cloned())
    }

    async fn insert(&self, mut user: User) -> Result<User, AuthError> {
        let mut users = self.users.lock().map_err(|_| poisoned())?;
        if users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(AuthError::UserAlreadyExists);
        }

        user.id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        users.push(user.clone());
        drop(users);

        log::debug!(target: "spectrum_gateway::repository", "msg=\"user inserted\" user_id={}", user.id);
        Ok(user)
    }
}
