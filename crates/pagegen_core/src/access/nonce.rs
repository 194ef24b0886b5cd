//! Per-action anti-forgery tokens.
//!
//! A token is the hex SHA-256 of `secret || 0x00 || action`. It proves the
//! request was prepared by someone holding the secret for that exact action.

use crate::error::PageGenError;
use sha2::{Digest, Sha256};

/// Action name guarding delete-by-source.
pub const ACTION_DELETE_BY_SOURCE: &str = "delete_pages_by_source";

/// Validates anti-forgery tokens presented with a request.
pub trait NonceVerifier {
    fn verify(&self, action: &str, token: &str) -> bool;
}

/// Secret-keyed token issuer and verifier.
#[derive(Clone)]
pub struct ActionNonce {
    secret: Vec<u8>,
}

impl ActionNonce {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Issues the token for `action`.
    pub fn issue(&self, action: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.secret);
        hasher.update([0u8]);
        hasher.update(action.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl std::fmt::Debug for ActionNonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionNonce").finish_non_exhaustive()
    }
}

impl NonceVerifier for ActionNonce {
    fn verify(&self, action: &str, token: &str) -> bool {
        constant_time_eq(self.issue(action).as_bytes(), token.trim().as_bytes())
    }
}

/// Fails with `Unauthorized` unless `token` is valid for `action`.
pub fn check_nonce(
    verifier: &impl NonceVerifier,
    action: &str,
    token: &str,
) -> Result<(), PageGenError> {
    if verifier.verify(action, token) {
        return Ok(());
    }
    Err(PageGenError::Unauthorized(format!(
        "invalid anti-forgery token for `{action}`"
    )))
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
