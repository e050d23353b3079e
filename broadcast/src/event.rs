//! Events pushed to session subscribers.

use rollcall_types::{RiskTier, SessionId, SubjectId, TierCounts, Timestamp};
use serde::{Deserialize, Serialize};

/// One event in a session's room.
///
/// Delivery is at-most-once and best-effort; anything a consumer must not
/// miss lives in the scan records, not here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    TokenRefreshed {
        session: SessionId,
        token: String,
        expires_at: Timestamp,
        refresh_interval_ms: u64,
    },
    CheckInRecorded {
        session: SessionId,
        subject: SubjectId,
        accepted: bool,
        risk_score: u8,
        tier: RiskTier,
    },
    AlertRaised {
        session: SessionId,
        subject: SubjectId,
        risk_score: u8,
        tier: RiskTier,
    },
    WindowClosed {
        session: SessionId,
        counts: TierCounts,
    },
}
