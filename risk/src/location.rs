//! Location factor — distance from the subject's dominant historical
//! cluster, and cluster consistency.

use crate::analyzer::{clamp_score, severity_for, AttemptContext, FactorScore, RiskAnalyzer};
use rollcall_geo::distance_m;
use rollcall_store::{ScanStore, StoreError};
use rollcall_types::Timestamp;

pub struct LocationFactor {
    lookback_secs: u64,
}

impl LocationFactor {
    pub fn new(lookback_secs: u64) -> Self {
        Self { lookback_secs }
    }
}

impl RiskAnalyzer for LocationFactor {
    fn name(&self) -> &'static str {
        "location"
    }

    fn alert_threshold(&self) -> u32 {
        25
    }

    fn recommendation(&self) -> &'static str {
        "Verify location consistency"
    }

    fn analyze(
        &self,
        history: &dyn ScanStore,
        ctx: &AttemptContext,
        now: Timestamp,
    ) -> Result<FactorScore, StoreError> {
        let since = Timestamp::new(now.as_secs().saturating_sub(self.lookback_secs));
        let clusters = history.location_clusters(ctx.subject, since)?;

        let mut raw: i32 = 0;
        let mut flags = Vec::new();

        if let Some(dominant) = clusters.first() {
            if let Some(point) = ctx.point {
                let deviation = distance_m(dominant.point(), point);
                if deviation > 1000.0 {
                    raw += 40;
                    flags.push("significant_location_change".to_string());
                } else if deviation > 500.0 {
                    raw += 20;
                    flags.push("unusual_location".to_string());
                } else if deviation > 100.0 {
                    raw += 5;
                }
            }

            // Ratio of dominant-cluster sightings to distinct clusters seen.
            let consistency = dominant.frequency as f64 / clusters.len() as f64;
            if consistency < 0.5 {
                raw += 15;
                flags.push("inconsistent_location".to_string());
            } else if consistency > 0.8 {
                raw -= 10;
            }
        }

        let score = clamp_score(raw);
        Ok(FactorScore {
            score,
            severity: severity_for(score, 30, 15),
            flags,
        })
    }
}
