//! Engine parameters — every tunable the check-in engine honors.
//!
//! Defaults reproduce the production values: a 25-second token validity
//! window refreshed every 20 seconds, a 50 m geofence, and a 10-attempt /
//! 60-second replay guard. Analyzer lookbacks vary per factor.

use serde::{Deserialize, Serialize};

const DAY_SECS: u64 = 86_400;

/// All parameters consumed by the rollcall engine.
///
/// Serde-derived so an outer configuration layer can load it from TOML or
/// JSON; the engine itself only ever receives the struct.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineParams {
    // ── Token lifecycle ──────────────────────────────────────────────────
    /// Seconds a token stays valid after issuance.
    pub token_validity_secs: u64,

    /// Cadence of the broadcaster's refresh timer. Must not exceed the
    /// validity window or the displayed token would go dark between rotations.
    pub refresh_interval_secs: u64,

    // ── Geofence ─────────────────────────────────────────────────────────
    /// Tolerance radius around the session anchor, inclusive boundary.
    pub geofence_tolerance_m: f64,

    // ── Replay guard ─────────────────────────────────────────────────────
    /// Sliding window length for the per-subject attempt limiter.
    pub rate_window_secs: u64,

    /// Maximum attempts per subject inside one window.
    pub rate_max_attempts: u32,

    // ── Analyzer lookbacks ───────────────────────────────────────────────
    /// Device-factor history window.
    pub device_lookback_secs: u64,

    /// Location-factor history window.
    pub location_lookback_secs: u64,

    /// Network-factor history window.
    pub network_lookback_secs: u64,

    /// Temporal-factor attendance-rate window.
    pub attendance_lookback_secs: u64,

    /// Anomaly-factor history window.
    pub anomaly_lookback_secs: u64,

    /// Upper bound on scans the anomaly factor inspects.
    pub anomaly_scan_limit: usize,

    /// Composite score above which a past scan counts as "high risk" in the
    /// anomaly factor's repeated-flag check.
    pub flagged_score_threshold: u8,
}

impl EngineParams {
    /// Production defaults.
    pub fn defaults() -> Self {
        Self {
            token_validity_secs: 25,
            refresh_interval_secs: 20,
            geofence_tolerance_m: 50.0,
            rate_window_secs: 60,
            rate_max_attempts: 10,
            device_lookback_secs: 30 * DAY_SECS,
            location_lookback_secs: 60 * DAY_SECS,
            network_lookback_secs: 30 * DAY_SECS,
            attendance_lookback_secs: 60 * DAY_SECS,
            anomaly_lookback_secs: 7 * DAY_SECS,
            anomaly_scan_limit: 20,
            flagged_score_threshold: 60,
        }
    }

    /// Refresh cadence in milliseconds, as advertised to display clients.
    pub fn refresh_interval_ms(&self) -> u64 {
        self.refresh_interval_secs * 1000
    }

    /// Validate internal consistency. Returns the first violation found.
    pub fn validate(&self) -> Result<(), String> {
        if self.token_validity_secs == 0 {
            return Err("token_validity_secs must be positive".into());
        }
        if self.refresh_interval_secs == 0 {
            return Err("refresh_interval_secs must be positive".into());
        }
        if self.refresh_interval_secs > self.token_validity_secs {
            return Err(format!(
                "refresh interval {}s exceeds token validity {}s",
                self.refresh_interval_secs, self.token_validity_secs
            ));
        }
        if !(self.geofence_tolerance_m.is_finite() && self.geofence_tolerance_m > 0.0) {
            return Err("geofence_tolerance_m must be a positive finite value".into());
        }
        if self.rate_max_attempts == 0 || self.rate_window_secs == 0 {
            return Err("replay guard window and attempt cap must be positive".into());
        }
        Ok(())
    }
}

impl Default for EngineParams {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(EngineParams::defaults().validate().is_ok());
    }

    #[test]
    fn refresh_longer_than_validity_rejected() {
        let mut p = EngineParams::defaults();
        p.refresh_interval_secs = 30;
        p.token_validity_secs = 25;
        assert!(p.validate().is_err());
    }

    #[test]
    fn zero_tolerance_rejected() {
        let mut p = EngineParams::defaults();
        p.geofence_tolerance_m = 0.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn refresh_interval_reported_in_ms() {
        assert_eq!(EngineParams::defaults().refresh_interval_ms(), 20_000);
    }
}
