//! Signed token wire format.
//!
//! A token is `hex(payload) "." hex(tag)`: the bincode-encoded claims
//! followed by an HMAC-SHA256 tag over exactly those bytes. Verification
//! authenticates the raw payload segment before decoding it, so there is no
//! canonicalization step to get wrong.

use crate::error::TokenError;
use rollcall_crypto::{sha256_hex, sign_payload, verify_payload, TokenSecret, TokenSignature};
use rollcall_types::{IssuerId, SessionId, Timestamp};
use serde::{Deserialize, Serialize};

/// The claims carried by an attendance token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    pub session: SessionId,
    pub issuer: IssuerId,
    pub nonce: String,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
}

impl TokenPayload {
    /// Expiry is inclusive at the boundary: a token presented exactly at
    /// `expires_at` is already dead.
    pub fn expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

/// An encoded, signed token as handed to clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedToken(String);

impl SignedToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// SHA-256 of the full token string, used in audit records so the raw
    /// token never has to be stored.
    pub fn digest(&self) -> String {
        sha256_hex(self.0.as_bytes())
    }
}

impl std::fmt::Display for SignedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode and sign a payload.
pub fn seal(payload: &TokenPayload, secret: &TokenSecret) -> Result<SignedToken, TokenError> {
    let bytes = bincode::serialize(payload).map_err(|e| TokenError::Codec(e.to_string()))?;
    let tag = sign_payload(&bytes, secret);
    Ok(SignedToken(format!("{}.{}", hex::encode(&bytes), tag.to_hex())))
}

/// Authenticate and decode a presented token string.
///
/// All failure modes collapse to `None`: a malformed token and a forged tag
/// are indistinguishable to the caller, which treats both as tampering.
pub fn open(token: &str, secret: &TokenSecret) -> Option<TokenPayload> {
    let (payload_hex, tag_hex) = token.split_once('.')?;
    let bytes = hex::decode(payload_hex).ok()?;
    let tag: [u8; 32] = hex::decode(tag_hex).ok()?.try_into().ok()?;
    if !verify_payload(&bytes, &TokenSignature(tag), secret) {
        return None;
    }
    bincode::deserialize(&bytes).ok()
}
