//! Device factor — distinct-device variety and fingerprint novelty.

use crate::analyzer::{clamp_score, severity_for, AttemptContext, FactorScore, RiskAnalyzer};
use rollcall_store::{ScanStore, StoreError};
use rollcall_types::Timestamp;

/// Devices beyond this many distinct fingerprints suggest proxy check-ins.
const VARIETY_CAP: usize = 5;
/// Use count at which the dominant device earns a consistency bonus.
const DOMINANT_USE_COUNT: u32 = 20;
/// Only the heaviest few devices count as "recent pattern".
const RECENT_PATTERN_WIDTH: usize = 5;

pub struct DeviceFactor {
    lookback_secs: u64,
}

impl DeviceFactor {
    pub fn new(lookback_secs: u64) -> Self {
        Self { lookback_secs }
    }
}

impl RiskAnalyzer for DeviceFactor {
    fn name(&self) -> &'static str {
        "device"
    }

    fn alert_threshold(&self) -> u32 {
        20
    }

    fn recommendation(&self) -> &'static str {
        "Review device change history"
    }

    fn analyze(
        &self,
        history: &dyn ScanStore,
        ctx: &AttemptContext,
        now: Timestamp,
    ) -> Result<FactorScore, StoreError> {
        let since = Timestamp::new(now.as_secs().saturating_sub(self.lookback_secs));
        let usage = history.device_usage(ctx.subject, since)?;

        let mut raw: i32 = 0;
        let mut flags = Vec::new();

        if !usage.is_empty() {
            if usage.len() > VARIETY_CAP {
                raw += 25;
                flags.push("excessive_device_variety".to_string());
            }

            if usage[0].count >= DOMINANT_USE_COUNT {
                raw -= 15;
            }

            let seen_recently = usage
                .iter()
                .take(RECENT_PATTERN_WIDTH)
                .any(|u| u.device == ctx.device_hash);
            if !seen_recently {
                raw += 20;
                flags.push("unusual_device".to_string());
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
