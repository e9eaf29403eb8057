use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AuthError;
use crate::crypto::PasswordHasher;
use crate::validators::{
    ValidationError, validate_email, validate_password, validate_password_confirmation,
    validate_user_name,
};

/// A registered user.
///
/// The password hash never leaves the gateway: it is skipped when the user
/// is serialized into a response body, a session state or the `X-User`
/// header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip)]
    pub pass_hash: String,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    /// Replaces the stored hash with one for `password`.
    pub fn set_password(
        &mut self,
        password: &str,
        hasher: &dyn PasswordHasher,
    ) -> Result<(), AuthError> {
        self.pass_hash = hasher.hash(password)?;
        Ok(())
    }

    /// Checks `password` against the stored hash.
    ///
    /// A user without a hash never authenticates.
    pub fn authenticate(&self, password: &str, hasher: &dyn PasswordHasher) -> Result<(), AuthError> {
        if self.pass_hash.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }
        if hasher.verify(password, &self.pass_hash)? {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

#[cfg(test)]
impl User {
    pub fn mock_from_email(email: &str) -> Self {
        Self {
            id: 1,
            email: email.to_owned(),
            pass_hash: String::new(),
            user_name: "tester".to_owned(),
            first_name: "Test".to_owned(),
            last_name: "User".to_owned(),
        }
    }
}

/// Signup payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub password_conf: String,
    pub user_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_email(&self.email)?;
        validate_password(&self.password)?;
        validate_password_confirmation(&self.password, &self.password_conf)?;
        validate_user_name(&self.user_name)?;
        Ok(())
    }

    /// Validates and converts into a [`User`] with a hashed password and
    /// no id yet. The repository assigns the id on insert.
    pub fn to_user(&self, hasher: &dyn PasswordHasher) -> Result<User, AuthError> {
        self.validate()?;

        let mut user = User {
            id: 0,
            email: self.email.trim().to_owned(),
            pass_hash: String::new(),
            user_name: self.user_name.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        };
        user.set_password(&self.password, hasher)?;
        Ok(user)
    }
}

/// Login payload.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;
    /// Stores `user` and returns it with its assigned id.
    ///
    /// Fails with [`AuthError::UserAlreadyExists`] if the email is taken.
    async fn insert(&self, user: User) -> Result<User, AuthError>;
}
