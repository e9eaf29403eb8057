use std::time::Duration;

use super::SignedIn;
use crate::crypto::{Argon2Hasher, PasswordHasher};
use crate::{AuthError, Credentials, SessionManager, SessionState, UserRepository};

pub struct LoginAction<U> {
    repository: U,
    sessions: SessionManager,
    hasher: Argon2Hasher,
    failure_delay: Duration,
}

impl<U: UserRepository> LoginAction<U> {
    pub fn new(repository: U, sessions: SessionManager, failure_delay: Duration) -> Self {
        Self {
            repository,
            sessions,
            hasher: Argon2Hasher::default(),
            failure_delay,
        }
    }

    #[must_use]
    pub fn with_hasher(mut self, hasher: Argon2Hasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Checks the credentials and starts a session.
    ///
    /// An unknown email and a wrong password both cost one Argon2
    /// verification, wait `failure_delay` and then fail with
    /// [`AuthError::InvalidCredentials`].
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "login", skip_all, err)
    )]
    pub async fn execute(&self, credentials: &Credentials) -> Result<SignedIn, AuthError> {
        let user = self.repository.get_by_email(&credentials.email).await?;

        let verified = match user {
            Some(user) => user
                .authenticate(&credentials.password, &self.hasher)
                .map(|()| user),
            None => self
                .hasher
                .verify(&credentials.password, &self.hasher.decoy_hash())
                .and(Err(AuthError::InvalidCredentials)),
        };

        let user = match verified {
            Ok(user) => user,
            Err(AuthError::InvalidCredentials) => {
                log::warn!(target: "spectrum_gateway::auth", "msg=\"login failed\"");
                tokio::time::sleep(self.failure_delay).await;
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        let (session_id, authorization) = self
            .sessions
            .begin(&SessionState::new(user.clone()))
            .await?;

        log::info!(target: "spectrum_gateway::auth", "msg=\"login success\" user_id={}", user.id);
        Ok(SignedIn {
            user,
            session_id,
            authorization,
        })
    }
}
