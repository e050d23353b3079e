//! Anomaly factor — physically impossible movement and repeat offenders.

use crate::analyzer::{clamp_score, severity_for, AttemptContext, FactorScore, RiskAnalyzer};
use rollcall_store::{ScanStore, StoreError};
use rollcall_types::Timestamp;

/// Two scans further apart than this, closer in time than
/// [`MIN_TRAVEL_GAP_SECS`], cannot belong to one person.
const TELEPORT_DISTANCE_M: f64 = 500.0;
const MIN_TRAVEL_GAP_SECS: u64 = 5 * 60;
/// More high-risk scans than this in the window marks a pattern, not a fluke.
const HIGH_RISK_REPEAT_CAP: usize = 3;

pub struct AnomalyFactor {
    lookback_secs: u64,
    scan_limit: usize,
    flagged_threshold: u8,
}

impl AnomalyFactor {
    pub fn new(lookback_secs: u64, scan_limit: usize, flagged_threshold: u8) -> Self {
        Self {
            lookback_secs,
            scan_limit,
            flagged_threshold,
        }
    }
}

impl RiskAnalyzer for AnomalyFactor {
    fn name(&self) -> &'static str {
        "anomaly"
    }

    fn alert_threshold(&self) -> u32 {
        20
    }

    fn recommendation(&self) -> &'static str {
        "Investigate suspicious activity"
    }

    fn analyze(
        &self,
        history: &dyn ScanStore,
        ctx: &AttemptContext,
        now: Timestamp,
    ) -> Result<FactorScore, StoreError> {
        let since = Timestamp::new(now.as_secs().saturating_sub(self.lookback_secs));
        let scans = history.recent_scans(ctx.subject, since, self.scan_limit)?;

        let mut raw: i32 = 0;
        let mut flags = Vec::new();

        // Scans arrive newest-first; compare each adjacent pair that has
        // coordinates on both sides.
        for pair in scans.windows(2) {
            let (Some(a), Some(b)) = (pair[0].point, pair[1].point) else {
                continue;
            };
            let gap_secs = pair[1].recorded_at.elapsed_since(pair[0].recorded_at);
            if rollcall_geo::distance_m(a, b) > TELEPORT_DISTANCE_M
                && gap_secs < MIN_TRAVEL_GAP_SECS
            {
                raw += 35;
                flags.push("impossible_movement".to_string());
                break;
            }
        }

        let high_risk = scans
            .iter()
            .filter(|s| s.risk_score > self.flagged_threshold)
            .count();
        if high_risk > HIGH_RISK_REPEAT_CAP {
            raw += 25;
            flags.push("repeated_high_risk_scans".to_string());
        }

        let score = clamp_score(raw);
        Ok(FactorScore {
            score,
            severity: severity_for(score, 20, 10),
            flags,
        })
    }
}
