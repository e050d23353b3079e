//! Attendance token lifecycle.
//!
//! A session's check-in window is backed by a short-lived, HMAC-signed token
//! that rotates every few seconds. This crate owns issuing, rotating,
//! validating, and invalidating those tokens; everything it needs from the
//! outside world arrives through the [`TtlCache`](rollcall_cache::TtlCache)
//! and store traits, so the whole lifecycle is testable in memory.

pub mod error;
pub mod manager;
pub mod payload;

pub use error::TokenError;
pub use manager::{IssuedToken, TokenManager, ValidatedCheckIn, Validation};
pub use payload::{SignedToken, TokenPayload};
