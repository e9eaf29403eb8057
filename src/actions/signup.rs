use super::SignedIn;
use crate::crypto::Argon2Hasher;
use crate::{AuthError, NewUser, SessionManager, SessionState, UserRepository};

pub struct SignupAction<U> {
    repository: U,
    sessions: SessionManager,
    hasher: Argon2Hasher,
}

impl<U: UserRepository> SignupAction<U> {
    pub fn new(repository: U, sessions: SessionManager) -> Self {
        Self {
            repository,
            sessions,
            hasher: Argon2Hasher::default(),
        }
    }

    #[must_use]
    pub fn with_hasher(mut self, hasher: Argon2Hasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Creates the account and signs the new user in.
    ///
    /// # Returns
    ///
    /// - `Ok(SignedIn)` - user stored, session started
    /// - `Err(AuthError::Validation(_))` - bad email, password or username
    /// - `Err(AuthError::UserAlreadyExists)` - email already registered
    /// - `Err(AuthError::Session(_))` - user stored but the session could not be started
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "signup", skip_all, err)
    )]
    pub async fn execute(&self, input: &NewUser) -> Result<SignedIn, AuthError> {
        input.validate()?;

        if self.repository.get_by_email(&input.email).await?.is_some() {
            log::info!(target: "spectrum_gateway::auth", "msg=\"signup rejected\" reason=\"email taken\"");
            return Err(AuthError::UserAlreadyExists);
        }

        let user = input.to_user(&self.hasher)?;
        let user = self.repository.insert(user).await?;

        let (session_id, authorization) = self
            .sessions
            .begin(&SessionState::new(user.clone()))
            .await?;

        log::info!(target: "spectrum_gateway::auth", "msg=\"signup success\" user_id={}", user.id);
        Ok(SignedIn {
            user,
            session_id,
            authorization,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::session::InMemorySessionStore;
    use crate::validators::ValidationError;
    use crate::{InMemoryUserRepository, SessionConfig};

    fn sessions() -> SessionManager {
        SessionManager::new(
            SessionConfig::new("test-secret-key-that-is-long-enough"),
            Arc::new(InMemorySessionStore::new(Duration::from_secs(150))),
        )
    }

    fn action(repo: InMemoryUserRepository) -> SignupAction<InMemoryUserRepository> {
        SignupAction::new(repo, sessions()).with_hasher(Argon2Hasher::new(8192, 1, 1))
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_owned(),
            password: "securepassword".to_owned(),
            password_conf: "securepassword".to_owned(),
            user_name: "alice".to_owned(),
            first_name: "Alice".to_owned(),
            last_name: "Liddell".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_signup_success() {
        let repo = InMemoryUserRepository::new();
        let signup = action(repo.clone());

        let signed_in = signup.execute(&new_user("user@example.com")).await.unwrap();

        assert_eq!(signed_in.user.id, 1);
        assert_eq!(signed_in.user.email, "user@example.com");
        assert_eq!(
            signed_in.authorization,
            format!("Bearer {}", signed_in.session_id)
        );
        let stored = repo.get_by_email("user@example.com").await.unwrap().unwrap();
        assert!(stored.pass_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_signup_user_already_exists() {
        let repo = InMemoryUserRepository::new();
        let signup = action(repo.clone());

        signup.execute(&new_user("user@example.com")).await.unwrap();
        let result = signup.execute(&new_user("user@example.com")).await;

        assert_eq!(result.unwrap_err(), AuthError::UserAlreadyExists);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_signup_validation_runs_before_storage() {
        let repo = InMemoryUserRepository::new();
        let signup = action(repo.clone());

        let mut input = new_user("user@example.com");
        input.user_name = "alice liddell".to_owned();

        assert_eq!(
            signup.execute(&input).await.unwrap_err(),
            AuthError::Validation(ValidationError::UserNameHasSpaces)
        );
        assert!(repo.is_empty());
    }
}
