//! Rejection taxonomy for check-in attempts.
//!
//! Every rejection carries a stable machine code, a human-readable message,
//! and a risk flag. The four security-relevant kinds short-circuit before
//! the scoring engine runs and report the maximal flag so callers can deny
//! without wasted computation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a check-in attempt was rejected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    /// Token expiry claim has passed, or the cache entry is gone/superseded.
    ExpiredToken,
    /// Signature did not verify against the shared secret.
    TamperedToken,
    /// Token is bound to a different session than the one submitted.
    SessionMismatch,
    /// This subject already consumed this token.
    AlreadyUsed,
    /// Reported point is outside the session geofence.
    OutOfRange { distance_m: f64, tolerance_m: f64 },
    /// No coordinates submitted, or the anchor has none. Never treated as a pass.
    MissingLocation,
    /// Sliding-window replay guard tripped.
    RateLimited { retry_after_secs: u64 },
}

impl RejectReason {
    /// Stable machine-readable code, for clients and the audit trail.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ExpiredToken => "TOKEN_EXPIRED",
            Self::TamperedToken => "TOKEN_TAMPERED",
            Self::SessionMismatch => "SESSION_MISMATCH",
            Self::AlreadyUsed => "ALREADY_USED",
            Self::OutOfRange { .. } => "OUT_OF_RANGE",
            Self::MissingLocation => "MISSING_LOCATION",
            Self::RateLimited { .. } => "RATE_LIMITED",
        }
    }

    /// Risk score reported in place of a composite when scoring was skipped.
    pub fn risk_flag(&self) -> u8 {
        match self {
            Self::ExpiredToken | Self::TamperedToken | Self::AlreadyUsed => 100,
            Self::SessionMismatch => 95,
            Self::OutOfRange { .. } | Self::MissingLocation => 85,
            Self::RateLimited { .. } => 0,
        }
    }

    /// The four kinds that deny before the scorer runs.
    pub fn is_security(&self) -> bool {
        matches!(
            self,
            Self::ExpiredToken | Self::TamperedToken | Self::SessionMismatch | Self::AlreadyUsed
        )
    }

    /// Human-readable message for client display.
    pub fn message(&self) -> String {
        match self {
            Self::ExpiredToken => "attendance code has expired".into(),
            Self::TamperedToken => "invalid or tampered attendance code".into(),
            Self::SessionMismatch => "attendance code does not match this session".into(),
            Self::AlreadyUsed => "you have already checked in for this session".into(),
            Self::OutOfRange {
                distance_m,
                tolerance_m,
            } => format!(
                "you are {:.0}m away from the session location (max {:.0}m)",
                distance_m, tolerance_m
            ),
            Self::MissingLocation => "location is required to check in".into(),
            Self::RateLimited { retry_after_secs } => format!(
                "too many check-in attempts, retry in {retry_after_secs}s"
            ),
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_kinds_carry_maximal_flags() {
        assert_eq!(RejectReason::ExpiredToken.risk_flag(), 100);
        assert_eq!(RejectReason::TamperedToken.risk_flag(), 100);
        assert_eq!(RejectReason::AlreadyUsed.risk_flag(), 100);
        assert_eq!(RejectReason::SessionMismatch.risk_flag(), 95);
        assert!(RejectReason::SessionMismatch.is_security());
    }

    #[test]
    fn geofence_kinds_are_not_security_class() {
        let reason = RejectReason::OutOfRange {
            distance_m: 200.0,
            tolerance_m: 50.0,
        };
        assert!(!reason.is_security());
        assert_eq!(reason.risk_flag(), 85);
        assert!(reason.message().contains("200m"));
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            RejectReason::RateLimited {
                retry_after_secs: 60
            }
            .code(),
            "RATE_LIMITED"
        );
        assert_eq!(RejectReason::MissingLocation.code(), "MISSING_LOCATION");
    }

    #[test]
    fn serde_tags_by_kind() {
        let json = serde_json::to_value(RejectReason::ExpiredToken).unwrap();
        assert_eq!(json["kind"], "expired_token");
    }
}
