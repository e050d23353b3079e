//! HMAC-SHA256 signing and verification of token payloads.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Shared secret used to sign and verify attendance tokens.
#[derive(Clone)]
pub struct TokenSecret(Vec<u8>);

impl TokenSecret {
    /// Wrap raw secret bytes. Callers load these from the environment or a
    /// secrets manager; the engine never generates the secret itself.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for TokenSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the secret material.
        write!(f, "TokenSecret({} bytes)", self.0.len())
    }
}

/// A 32-byte HMAC-SHA256 tag over a token payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenSignature(pub [u8; 32]);

impl TokenSignature {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Sign canonical payload bytes with the shared secret.
pub fn sign_payload(payload: &[u8], secret: &TokenSecret) -> TokenSignature {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(payload);
    let tag = mac.finalize().into_bytes();
    let mut out = [0u8; 32];
    out.copy_from_slice(&tag);
    TokenSignature(out)
}

/// Verify a signature against payload bytes and the shared secret.
///
/// Returns `true` if the tag matches. Comparison is constant time via the
/// `hmac` crate's own verifier.
pub fn verify_payload(payload: &[u8], signature: &TokenSignature, secret: &TokenSecret) -> bool {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(payload);
    mac.verify_slice(&signature.0).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> TokenSecret {
        TokenSecret::new(*b"rollcall-test-secret-0123456789a")
    }

    #[test]
    fn sign_and_verify() {
        let sig = sign_payload(b"session payload bytes", &secret());
        assert!(verify_payload(b"session payload bytes", &sig, &secret()));
    }

    #[test]
    fn wrong_payload_fails() {
        let sig = sign_payload(b"correct payload", &secret());
        assert!(!verify_payload(b"forged payload", &sig, &secret()));
    }

    #[test]
    fn wrong_secret_fails() {
        let sig = sign_payload(b"payload", &secret());
        let other = TokenSecret::new(*b"another-secret-entirely-9876543z");
        assert!(!verify_payload(b"payload", &sig, &other));
    }

    #[test]
    fn tampered_tag_fails() {
        let mut sig = sign_payload(b"payload", &secret());
        sig.0[0] ^= 0x01;
        assert!(!verify_payload(b"payload", &sig, &secret()));
    }

    #[test]
    fn signing_is_deterministic() {
        let a = sign_payload(b"same bytes", &secret());
        let b = sign_payload(b"same bytes", &secret());
        assert_eq!(a, b);
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let printed = format!("{:?}", secret());
        assert!(!printed.contains("rollcall-test-secret"));
    }
}
