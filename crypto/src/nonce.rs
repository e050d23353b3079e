//! Per-issuance nonces.

use rand::RngCore;

/// Number of random bytes behind each nonce (32 hex chars on the wire).
pub const NONCE_BYTES: usize = 16;

/// Generate a fresh random nonce, hex-encoded.
///
/// The nonce makes successive tokens for the same session unpredictable and
/// keys the per-rotation consumed-subject set.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
