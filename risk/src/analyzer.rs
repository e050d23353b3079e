//! The common analyzer interface.

use rollcall_store::{ScanStore, StoreError};
use rollcall_types::{DeviceHash, GeoPoint, NetAddr, SeriesId, Severity, SubjectId, Timestamp};
use serde::{Deserialize, Serialize};

/// Everything an analyzer may inspect about the current attempt.
#[derive(Clone, Debug)]
pub struct AttemptContext {
    pub subject: SubjectId,
    pub series: SeriesId,
    pub session_starts_at: Timestamp,
    pub point: Option<GeoPoint>,
    pub device_hash: DeviceHash,
    pub net_addr: NetAddr,
}

/// One analyzer's sub-result for one attempt.
///
/// `score` has already been clamped at 0: reputation bonuses can reduce a
/// factor toward zero but never push it negative, and never offset other
/// factors before weighting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorScore {
    pub score: u32,
    pub severity: Severity,
    pub flags: Vec<String>,
}

impl FactorScore {
    /// A degraded result: the history lookup failed, so the factor
    /// contributes nothing rather than aborting the check-in.
    pub fn unknown() -> Self {
        Self {
            score: 0,
            severity: Severity::Unknown,
            flags: Vec::new(),
        }
    }
}

/// One independent risk factor.
///
/// Implementations read history through [`ScanStore`] only — they never
/// mutate anything — and take `now` explicitly so tests control the clock.
pub trait RiskAnalyzer: Send + Sync {
    /// Short factor name used in reports and logs ("device", "location", …).
    fn name(&self) -> &'static str;

    /// Sub-score above which this factor contributes a recommendation.
    fn alert_threshold(&self) -> u32;

    /// Human-readable hint surfaced when the threshold is exceeded.
    fn recommendation(&self) -> &'static str;

    fn analyze(
        &self,
        history: &dyn ScanStore,
        ctx: &AttemptContext,
        now: Timestamp,
    ) -> Result<FactorScore, StoreError>;
}

/// Shared helper: accumulate signed adjustments, clamp at zero, pick a
/// severity from per-factor thresholds.
pub(crate) fn clamp_score(raw: i32) -> u32 {
    raw.max(0) as u32
}

pub(crate) fn severity_for(score: u32, high_above: u32, medium_above: u32) -> Severity {
    if score > high_above {
        Severity::High
    } else if score > medium_above {
        Severity::Medium
    } else {
        Severity::Low
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use rollcall_types::{
        RiskTier, ScanAttempt, ScanOutcome, SessionId,
    };

    /// Context for subject 1 in series 10, session starting at t=10_000.
    pub fn ctx() -> AttemptContext {
        AttemptContext {
            subject: SubjectId::new(1),
            series: SeriesId::new(10),
            session_starts_at: Timestamp::new(10_000),
            point: Some(GeoPoint::new(6.5244, 3.3792)),
            device_hash: DeviceHash::new("trusted-device"),
            net_addr: NetAddr::new("192.0.2.10"),
        }
    }

    /// A historical accepted scan for seeding the memory store.
    pub fn history_scan(
        at: u64,
        device: &str,
        addr: &str,
        point: Option<GeoPoint>,
        score: u8,
    ) -> ScanAttempt {
        ScanAttempt {
            subject: SubjectId::new(1),
            session: SessionId::new(1),
            token_digest: "00".repeat(32),
            point,
            device_hash: DeviceHash::new(device),
            net_addr: NetAddr::new(addr),
            distance_m: Some(3.0),
            risk_score: score,
            tier: RiskTier::from_score(score),
            outcome: ScanOutcome::Accepted,
            recorded_at: Timestamp::new(at),
        }
    }
}
