//! Cryptographic primitives for the rollcall engine.
//!
//! Token integrity rests on a shared-secret HMAC rather than asymmetric
//! signatures: the issuer and the validator are the same trusted backend, so
//! a MAC over the canonical payload bytes is sufficient and cheap.

pub mod digest;
pub mod nonce;
pub mod sign;

pub use digest::sha256_hex;
pub use nonce::generate_nonce;
pub use sign::{sign_payload, verify_payload, TokenSecret, TokenSignature};
