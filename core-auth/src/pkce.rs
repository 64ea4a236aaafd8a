//! PKCE (RFC 7636) and per-request anti-replay values.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Secrets generated for one authorize request.
///
/// The verifier never leaves the device until the code exchange; only its
/// S256 challenge is sent with the authorize request.
#[derive(Clone)]
pub(crate) struct AuthorizationSecrets {
    code_verifier: String,
    state: String,
    nonce: String,
}

impl AuthorizationSecrets {
    pub(crate) fn generate() -> Self {
        Self {
            // 32 bytes gives a 43 character verifier, the RFC minimum
            code_verifier: random_url_safe(32),
            state: random_url_safe(16),
            nonce: random_url_safe(16),
        }
    }

    pub(crate) fn code_verifier(&self) -> &str {
        &self.code_verifier
    }

    pub(crate) fn state(&self) -> &str {
        &self.state
    }

    pub(crate) fn nonce(&self) -> &str {
        &self.nonce
    }

    /// BASE64URL(SHA256(code_verifier))
    pub(crate) fn code_challenge(&self) -> String {
        let hash = Sha256::digest(self.code_verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hash)
    }
}

fn random_url_safe(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill(bytes.as_mut_slice());
    URL_SAFE_NO_PAD.encode(bytes)
}
