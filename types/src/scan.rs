//! Scan attempts — the immutable audit record of every check-in outcome.

use crate::{
    DeviceHash, GeoPoint, NetAddr, RejectReason, RiskTier, SessionId, SubjectId, Timestamp,
};
use serde::{Deserialize, Serialize};

/// Client-side signals submitted alongside a token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckInContext {
    /// Reported coordinates. `None` when the client denied location access.
    pub point: Option<GeoPoint>,
    pub device_hash: DeviceHash,
    pub net_addr: NetAddr,
}

/// Outcome of one validated (or rejected) check-in attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScanOutcome {
    Accepted,
    Rejected { reason: RejectReason },
}

impl ScanOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// One validation outcome, written exactly once and never mutated.
///
/// Downstream this is both the authoritative attendance record and the
/// historical input the risk analyzers read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanAttempt {
    pub subject: SubjectId,
    pub session: SessionId,
    /// SHA-256 digest of the submitted token, hex-encoded. The raw token is
    /// never persisted.
    pub token_digest: String,
    pub point: Option<GeoPoint>,
    pub device_hash: DeviceHash,
    pub net_addr: NetAddr,
    /// Geofence distance in meters. Present whenever both the anchor and the
    /// reported point existed, including on rejection — the audit trail keeps
    /// the distance even for denied attempts.
    pub distance_m: Option<f64>,
    /// Composite risk score, or the rejection's risk flag when scoring was
    /// short-circuited.
    pub risk_score: u8,
    pub tier: RiskTier,
    pub outcome: ScanOutcome,
    pub recorded_at: Timestamp,
}

impl ScanAttempt {
    /// Whether this record counts as high risk for the anomaly analyzer's
    /// repeated-flag lookback.
    pub fn is_flagged(&self, threshold: u8) -> bool {
        self.risk_score > threshold
    }
}
