//! Sensitive data wrapper types.
//!
//! The session signing key lives in a [`SecretString`] so it never ends up in
//! a log line.

use std::fmt;

use serde::{Deserialize, Deserializer};

/// A string whose `Debug` and `Display` output is always `[REDACTED]`.
///
/// Only `Deserialize` is implemented: secrets are read in, never written out.
///
/// ```rust
/// use spectrum_gateway::SecretString;
///
/// let key = SecretString::new("a-very-long-signing-key-for-sessions");
/// assert_eq!(format!("{key:?}"), "SecretString([REDACTED])");
/// assert_eq!(key.expose_secret(), "a-very-long-signing-key-for-sessions");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Exposes the secret value.
    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Raw bytes, used as HMAC key material.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretString)
    }
}
