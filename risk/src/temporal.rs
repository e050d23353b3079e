//! Temporal factor — submission timing relative to session start, and the
//! subject's historical attendance rate for the same series.

use crate::analyzer::{clamp_score, severity_for, AttemptContext, FactorScore, RiskAnalyzer};
use rollcall_store::{ScanStore, StoreError};
use rollcall_types::Timestamp;

pub struct TemporalFactor {
    attendance_lookback_secs: u64,
}

impl TemporalFactor {
    pub fn new(attendance_lookback_secs: u64) -> Self {
        Self {
            attendance_lookback_secs,
        }
    }
}

impl RiskAnalyzer for TemporalFactor {
    fn name(&self) -> &'static str {
        "temporal"
    }

    fn alert_threshold(&self) -> u32 {
        15
    }

    fn recommendation(&self) -> &'static str {
        "Monitor attendance timing patterns"
    }

    fn analyze(
        &self,
        history: &dyn ScanStore,
        ctx: &AttemptContext,
        now: Timestamp,
    ) -> Result<FactorScore, StoreError> {
        let mut raw: i32 = 0;
        let mut flags = Vec::new();

        let minutes_late = now.signed_delta_secs(ctx.session_starts_at) as f64 / 60.0;
        if minutes_late > 15.0 {
            raw += 20;
            flags.push("late_scan".to_string());
        } else if minutes_late > 5.0 {
            raw += 10;
            flags.push("slightly_late".to_string());
        } else if minutes_late < -5.0 {
            raw += 5;
            flags.push("early_scan".to_string());
        }

        let since = Timestamp::new(
            now.as_secs()
                .saturating_sub(self.attendance_lookback_secs),
        );
        let counts = history.attendance_counts(ctx.subject, ctx.series, since)?;
        if let Some(rate) = counts.rate() {
            if rate < 0.5 {
                raw += 15;
                flags.push("low_attendance_rate".to_string());
            } else if rate > 0.9 {
                raw -= 10;
            }
        }

        let score = clamp_score(raw);
        Ok(FactorScore {
            score,
            severity: severity_for(score, 20, 10),
            flags,
        })
    }
}
