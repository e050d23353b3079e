//! Alerts emitted for high-severity check-ins.

use crate::{RiskTier, SessionId, SubjectId, Timestamp};
use serde::{Deserialize, Serialize};

/// Raised when a check-in's composite tier is high or critical.
///
/// The engine only emits alerts; the pending → resolved lifecycle belongs to
/// the external review workflow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub session: SessionId,
    pub subject: SubjectId,
    /// Digest of the token behind the flagged scan, linking back to the
    /// `ScanAttempt` audit row.
    pub token_digest: String,
    pub risk_score: u8,
    pub tier: RiskTier,
    pub raised_at: Timestamp,
}
