//! In-memory backend implementing every store trait.
//!
//! Used by unit and integration tests, and usable as a degraded standalone
//! mode when the relational store is unreachable (history then only covers
//! the current process lifetime).

use crate::{
    AlertStore, AttendanceCounts, DeviceUsage, LocationCluster, NetworkUsage, ScanSample,
    ScanStore, SessionStore, StoreError, TokenAuditRecord, TokenAuditStore, TokenStatus,
};
use rollcall_types::{Alert, ScanAttempt, SeriesId, SessionId, SessionInfo, SubjectId, Timestamp};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<SessionId, SessionInfo>>,
    scans: Mutex<Vec<ScanAttempt>>,
    tokens: Mutex<Vec<TokenAuditRecord>>,
    alerts: Mutex<Vec<Alert>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session as the external catalog would.
    pub fn insert_session(&self, info: SessionInfo) {
        self.sessions
            .lock()
            .expect("session map poisoned")
            .insert(info.session, info);
    }

    /// Seed a historical scan directly, bypassing the engine (test setup).
    pub fn seed_scan(&self, attempt: ScanAttempt) {
        self.scans.lock().expect("scan log poisoned").push(attempt);
    }

    /// Snapshot of every scan recorded so far.
    pub fn scans(&self) -> Vec<ScanAttempt> {
        self.scans.lock().expect("scan log poisoned").clone()
    }

    /// Snapshot of every alert raised so far.
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().expect("alert log poisoned").clone()
    }

    /// Snapshot of the token audit trail.
    pub fn token_audit(&self) -> Vec<TokenAuditRecord> {
        self.tokens.lock().expect("token log poisoned").clone()
    }

    fn series_of(&self, session: SessionId) -> Option<SeriesId> {
        self.sessions
            .lock()
            .ok()?
            .get(&session)
            .map(|info| info.series)
    }
}

impl SessionStore for MemoryStore {
    fn session_info(&self, session: SessionId) -> Result<Option<SessionInfo>, StoreError> {
        let sessions = self.sessions.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(sessions.get(&session).cloned())
    }
}

impl ScanStore for MemoryStore {
    fn append_scan(&self, attempt: &ScanAttempt) -> Result<(), StoreError> {
        let mut scans = self.scans.lock().map_err(|_| StoreError::Poisoned)?;
        scans.push(attempt.clone());
        Ok(())
    }

    fn device_usage(
        &self,
        subject: SubjectId,
        since: Timestamp,
    ) -> Result<Vec<DeviceUsage>, StoreError> {
        let scans = self.scans.lock().map_err(|_| StoreError::Poisoned)?;
        let mut counts: HashMap<String, u32> = HashMap::new();
        for scan in scans
            .iter()
            .filter(|s| s.subject == subject && s.recorded_at >= since)
        {
            *counts.entry(scan.device_hash.as_str().to_string()).or_insert(0) += 1;
        }
        let mut usage: Vec<DeviceUsage> = counts
            .into_iter()
            .map(|(device, count)| DeviceUsage {
                device: rollcall_types::DeviceHash::new(device),
                count,
            })
            .collect();
        usage.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(usage)
    }

    fn location_clusters(
        &self,
        subject: SubjectId,
        since: Timestamp,
    ) -> Result<Vec<LocationCluster>, StoreError> {
        let scans = self.scans.lock().map_err(|_| StoreError::Poisoned)?;
        // Granularity comes from `GeoPoint::rounded_4dp`; rescale to integer
        // space only so the map keys stay exact.
        let mut counts: HashMap<(i64, i64), u32> = HashMap::new();
        for scan in scans
            .iter()
            .filter(|s| s.subject == subject && s.recorded_at >= since)
        {
            if let Some(point) = scan.point {
                let (lat, lon) = point.rounded_4dp();
                let key = ((lat * 10_000.0).round() as i64, (lon * 10_000.0).round() as i64);
                *counts.entry(key).or_insert(0) += 1;
            }
        }
        let mut clusters: Vec<LocationCluster> = counts
            .into_iter()
            .map(|((lat, lon), frequency)| LocationCluster {
                lat: lat as f64 / 10_000.0,
                lon: lon as f64 / 10_000.0,
                frequency,
            })
            .collect();
        clusters.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        Ok(clusters)
    }

    fn network_usage(
        &self,
        subject: SubjectId,
        since: Timestamp,
    ) -> Result<Vec<NetworkUsage>, StoreError> {
        let scans = self.scans.lock().map_err(|_| StoreError::Poisoned)?;
        let mut counts: HashMap<String, u32> = HashMap::new();
        for scan in scans
            .iter()
            .filter(|s| s.subject == subject && s.recorded_at >= since)
        {
            *counts
                .entry(scan.net_addr.as_str().to_string())
                .or_insert(0) += 1;
        }
        let mut usage: Vec<NetworkUsage> = counts
            .into_iter()
            .map(|(addr, count)| NetworkUsage {
                addr: rollcall_types::NetAddr::new(addr),
                count,
            })
            .collect();
        usage.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(usage)
    }

    fn attendance_counts(
        &self,
        subject: SubjectId,
        series: SeriesId,
        since: Timestamp,
    ) -> Result<AttendanceCounts, StoreError> {
        let scans = self.scans.lock().map_err(|_| StoreError::Poisoned)?;
        let mut counts = AttendanceCounts {
            attended: 0,
            total: 0,
        };
        for scan in scans
            .iter()
            .filter(|s| s.subject == subject && s.recorded_at >= since)
        {
            if self.series_of(scan.session) == Some(series) {
                counts.total += 1;
                if scan.outcome.is_accepted() {
                    counts.attended += 1;
                }
            }
        }
        Ok(counts)
    }

    fn recent_scans(
        &self,
        subject: SubjectId,
        since: Timestamp,
        limit: usize,
    ) -> Result<Vec<ScanSample>, StoreError> {
        let scans = self.scans.lock().map_err(|_| StoreError::Poisoned)?;
        let mut samples: Vec<ScanSample> = scans
            .iter()
            .filter(|s| s.subject == subject && s.recorded_at >= since)
            .map(|s| ScanSample {
                recorded_at: s.recorded_at,
                point: s.point,
                risk_score: s.risk_score,
            })
            .collect();
        samples.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        samples.truncate(limit);
        Ok(samples)
    }
}

impl TokenAuditStore for MemoryStore {
    fn record_issued(&self, record: &TokenAuditRecord) -> Result<(), StoreError> {
        let mut tokens = self.tokens.lock().map_err(|_| StoreError::Poisoned)?;
        tokens.push(record.clone());
        Ok(())
    }

    fn record_invalidated(&self, session: SessionId, _at: Timestamp) -> Result<(), StoreError> {
        let mut tokens = self.tokens.lock().map_err(|_| StoreError::Poisoned)?;
        for record in tokens
            .iter_mut()
            .filter(|r| r.session == session && r.status == TokenStatus::Active)
        {
            record.status = TokenStatus::Invalidated;
        }
        Ok(())
    }
}

impl AlertStore for MemoryStore {
    fn append_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        let mut alerts = self.alerts.lock().map_err(|_| StoreError::Poisoned)?;
        alerts.push(alert.clone());
        Ok(())
    }
}
