//! One-way digests for the audit trail.

use sha2::{Digest, Sha256};

/// SHA-256 of arbitrary bytes, hex-encoded.
///
/// Used to persist token references without persisting the token itself.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_deterministic() {
        assert_eq!(sha256_hex(b"rollcall"), sha256_hex(b"rollcall"));
    }

    #[test]
    fn digest_distinguishes_inputs() {
        assert_ne!(sha256_hex(b"a"), sha256_hex(b"b"));
    }

    #[test]
    fn digest_is_64_hex_chars() {
        let d = sha256_hex(b"");
        assert_eq!(d.len(), 64);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
