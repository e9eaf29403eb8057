use argon2::{Algorithm, Argon2, Params, PasswordVerifier, Version};
use password_hash::{PasswordHash, PasswordHasher as ArgonPasswordHasher, SaltString};
use rand::rngs::OsRng;

use crate::AuthError;

const DECOY_SALT: &str = "c3BlY3RydW0tZ2F0ZXdheQ";
const DECOY_OUTPUT: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Password hashing and verification.
///
/// # Example
///
/// ```rust
/// use spectrum_gateway::crypto::{Argon2Hasher, PasswordHasher};
///
/// let hasher = Argon2Hasher::default();
/// let hash = hasher.hash("mypassword").unwrap();
/// assert!(hasher.verify("mypassword", &hash).unwrap());
/// assert!(!hasher.verify("wrongpassword", &hash).unwrap());
/// ```
pub trait PasswordHasher: Send + Sync {
    /// # Errors
    ///
    /// Returns `AuthError::PasswordHashError` if hashing fails.
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// # Errors
    ///
    /// Returns `AuthError::PasswordHashError` if the stored hash is malformed.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

/// Argon2id hasher.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    /// KiB
    memory_cost: u32,
    time_cost: u32,
    parallelism: u32,
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            memory_cost: 19456,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl Argon2Hasher {
    #[must_use]
    pub fn new(memory_cost: u32, time_cost: u32, parallelism: u32) -> Self {
        Self {
            memory_cost,
            time_cost,
            parallelism,
        }
    }

    /// 64 MiB, 3 iterations, 4 lanes.
    #[must_use]
    pub fn production() -> Self {
        Self::new(65536, 3, 4)
    }

    /// An encoded hash with this hasher's cost parameters that no password
    /// matches. Verifying against it costs as much as verifying a real user.
    #[must_use]
    pub fn decoy_hash(&self) -> String {
        format!(
            "$argon2id$v=19$m={},t={},p={}${DECOY_SALT}${DECOY_OUTPUT}",
            self.memory_cost, self.time_cost, self.parallelism
        )
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let params = Params::new(self.memory_cost, self.time_cost, self.parallelism, None)
            .map_err(|_| AuthError::PasswordHashError)?;

        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|_| AuthError::PasswordHashError)
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash).map_err(|_| AuthError::PasswordHashError)?;

        // parameters come from the encoded hash
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}
