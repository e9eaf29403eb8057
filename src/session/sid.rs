//! Signed session identifiers.
//!
//! A session id is 32 random bytes followed by their HMAC-SHA256, encoded as
//! unpadded URL-safe base64. The id carries no state; it only proves that
//! this gateway minted it.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;

use super::SessionError;
use crate::SecretString;

type HmacSha256 = Hmac<Sha256>;

/// Length of the random component in bytes.
pub const ID_LENGTH: usize = 32;

const SIGNATURE_LENGTH: usize = 32;
const SIGNED_LENGTH: usize = ID_LENGTH + SIGNATURE_LENGTH;

/// A validated, signed session id.
///
/// Values only come out of [`SessionId::new`] or [`SessionId::validate`], so
/// holding one means the signature has been checked against the signing key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Mints a new id signed with `signing_key`.
    pub fn new(signing_key: &SecretString) -> Result<Self, SessionError> {
        let mut buf = [0u8; SIGNED_LENGTH];
        OsRng
            .try_fill_bytes(&mut buf[..ID_LENGTH])
            .map_err(|e| SessionError::Generation(e.to_string()))?;

        let signature = sign(&buf[..ID_LENGTH], signing_key);
        buf[ID_LENGTH..].copy_from_slice(&signature);

        Ok(Self(URL_SAFE_NO_PAD.encode(buf)))
    }

    /// Checks that `raw` was minted with `signing_key`.
    pub fn validate(raw: &str, signing_key: &SecretString) -> Result<Self, SessionError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(raw)
            .map_err(|_| SessionError::InvalidFormat)?;
        if bytes.len() != SIGNED_LENGTH {
            return Err(SessionError::InvalidFormat);
        }

        let (id, signature) = bytes.split_at(ID_LENGTH);
        // verify_slice compares in constant time
        mac(signing_key)
            .chain_update(id)
            .verify_slice(signature)
            .map_err(|_| {
                log::warn!(
                    target: "spectrum_gateway::session",
                    "msg=\"session id signature mismatch\" token_prefix=\"{}...\"",
                    raw.chars().take(8).collect::<String>()
                );
                SessionError::InvalidSignature
            })?;

        Ok(Self(URL_SAFE_NO_PAD.encode(&bytes)))
    }

    /// Transport encoding, as placed after `Bearer `.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which this session's state is stored.
    pub fn store_key(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // enough to correlate log lines, not enough to replay
        write!(f, "SessionId({}...)", &self.0[..8.min(self.0.len())])
    }
}

fn mac(signing_key: &SecretString) -> HmacSha256 {
    // HMAC accepts keys of any length
    #[allow(clippy::expect_used)]
    HmacSha256::new_from_slice(signing_key.as_bytes()).expect("HMAC accepts keys of any size")
}

fn sign(id: &[u8], signing_key: &SecretString) -> [u8; SIGNATURE_LENGTH] {
    let mut out = [0u8; SIGNATURE_LENGTH];
    out.copy_from_slice(&mac(signing_key).chain_update(id).finalize().into_bytes());
    out
}
