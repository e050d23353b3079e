//! Network factor — address churn and novelty (relay/proxy indicators).

use crate::analyzer::{clamp_score, severity_for, AttemptContext, FactorScore, RiskAnalyzer};
use rollcall_store::{ScanStore, StoreError};
use rollcall_types::Timestamp;

/// Distinct addresses beyond this strongly suggest VPN/proxy hopping.
const HEAVY_CHURN: usize = 10;
/// Milder churn threshold.
const LIGHT_CHURN: usize = 5;
/// Use count at which the dominant address earns a stability bonus.
const DOMINANT_USE_COUNT: u32 = 15;

pub struct NetworkFactor {
    lookback_secs: u64,
}

impl NetworkFactor {
    pub fn new(lookback_secs: u64) -> Self {
        Self { lookback_secs }
    }
}

impl RiskAnalyzer for NetworkFactor {
    fn name(&self) -> &'static str {
        "network"
    }

    fn alert_threshold(&self) -> u32 {
        20
    }

    fn recommendation(&self) -> &'static str {
        "Check for VPN/Proxy usage"
    }

    fn analyze(
        &self,
        history: &dyn ScanStore,
        ctx: &AttemptContext,
        now: Timestamp,
    ) -> Result<FactorScore, StoreError> {
        let since = Timestamp::new(now.as_secs().saturating_sub(self.lookback_secs));
        let usage = history.network_usage(ctx.subject, since)?;

        let mut raw: i32 = 0;
        let mut flags = Vec::new();

        if !usage.is_empty() {
            if usage.len() > HEAVY_CHURN {
                raw += 30;
                flags.push("vpn_proxy_suspected".to_string());
            } else if usage.len() > LIGHT_CHURN {
                raw += 15;
                flags.push("frequent_ip_changes".to_string());
            }

            if !usage.iter().any(|u| u.addr == ctx.net_addr) {
                raw += 10;
                flags.push("new_ip_address".to_string());
            }

            if usage[0].count >= DOMINANT_USE_COUNT {
                raw -= 8;
            }
        }

        let score = clamp_score(raw);
        Ok(FactorScore {
            score,
            severity: severity_for(score, 25, 10),
            flags,
        })
    }
}
