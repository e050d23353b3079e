//! Weighted aggregation of the individual risk factors.

use crate::analyzer::{AttemptContext, FactorScore, RiskAnalyzer};
use crate::{AnomalyFactor, DeviceFactor, LocationFactor, NetworkFactor, TemporalFactor};
use rollcall_store::ScanStore;
use rollcall_types::{EngineParams, RiskTier, Severity, Timestamp};
use serde::Serialize;

/// One factor's contribution, as reported to callers and audit logs.
#[derive(Clone, Debug, Serialize)]
pub struct FactorReport {
    pub name: &'static str,
    pub weight: f64,
    pub score: u32,
    pub severity: Severity,
    pub flags: Vec<String>,
}

/// The composite result of a full assessment.
#[derive(Clone, Debug, Serialize)]
pub struct RiskAssessment {
    pub score: u8,
    pub tier: RiskTier,
    pub factors: Vec<FactorReport>,
    pub recommendations: Vec<String>,
}

impl RiskAssessment {
    pub fn flags(&self) -> impl Iterator<Item = &str> {
        self.factors.iter().flat_map(|f| f.flags.iter().map(String::as_str))
    }
}

/// Runs every configured analyzer and folds the sub-scores into one
/// composite in `[0, 100]`.
///
/// A failing analyzer degrades to a zero contribution instead of failing
/// the assessment: losing one signal must never block a check-in.
pub struct RiskEngine {
    analyzers: Vec<(f64, Box<dyn RiskAnalyzer>)>,
}

impl RiskEngine {
    pub fn new(analyzers: Vec<(f64, Box<dyn RiskAnalyzer>)>) -> Self {
        Self { analyzers }
    }

    /// The standard five-factor line-up with weights summing to 1.
    pub fn from_params(params: &EngineParams) -> Self {
        Self::new(vec![
            (0.20, Box::new(DeviceFactor::new(params.device_lookback_secs)) as Box<dyn RiskAnalyzer>),
            (0.25, Box::new(LocationFactor::new(params.location_lookback_secs))),
            (0.15, Box::new(NetworkFactor::new(params.network_lookback_secs))),
            (0.20, Box::new(TemporalFactor::new(params.attendance_lookback_secs))),
            (
                0.20,
                Box::new(AnomalyFactor::new(
                    params.anomaly_lookback_secs,
                    params.anomaly_scan_limit,
                    params.flagged_score_threshold,
                )),
            ),
        ])
    }

    pub fn assess(
        &self,
        history: &dyn ScanStore,
        ctx: &AttemptContext,
        now: Timestamp,
    ) -> RiskAssessment {
        let mut factors = Vec::with_capacity(self.analyzers.len());
        let mut recommendations = Vec::new();
        let mut weighted = 0.0f64;

        for (weight, analyzer) in &self.analyzers {
            let sub = match analyzer.analyze(history, ctx, now) {
                Ok(sub) => sub,
                Err(err) => {
                    tracing::warn!(
                        factor = analyzer.name(),
                        subject = ctx.subject.as_u64(),
                        %err,
                        "risk factor degraded, contributing zero"
                    );
                    FactorScore::unknown()
                }
            };

            weighted += weight * f64::from(sub.score);
            if sub.score > analyzer.alert_threshold() {
                recommendations.push(analyzer.recommendation().to_string());
            }
            factors.push(FactorReport {
                name: analyzer.name(),
                weight: *weight,
                score: sub.score,
                severity: sub.severity,
                flags: sub.flags,
            });
        }

        let score = weighted.round().min(100.0) as u8;
        RiskAssessment {
            score,
            tier: RiskTier::from_score(score),
            factors,
            recommendations,
        }
    }
}
