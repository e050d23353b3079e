//! Abstract storage traits for the rollcall engine.
//!
//! The relational store belongs to the surrounding platform; the engine
//! depends only on these traits. Every backend (SQL in production, in-memory
//! for tests) implements them. The engine's writes are append-only: scan
//! attempts, alerts, and token audit rows are immutable once written.

pub mod error;
pub mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

use rollcall_types::{
    Alert, DeviceHash, GeoPoint, NetAddr, ScanAttempt, SeriesId, SessionId, SessionInfo,
    SubjectId, Timestamp,
};
use serde::{Deserialize, Serialize};

/// Read access to the session catalog.
pub trait SessionStore: Send + Sync {
    /// Look up a session's anchor, schedule, and owner.
    fn session_info(&self, session: SessionId) -> Result<Option<SessionInfo>, StoreError>;
}

/// Per-device usage over a lookback window, heaviest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceUsage {
    pub device: DeviceHash,
    pub count: u32,
}

/// One historical location cluster (coordinates rounded to 4 decimals),
/// most frequent first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationCluster {
    pub lat: f64,
    pub lon: f64,
    pub frequency: u32,
}

impl LocationCluster {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

/// Per-address usage over a lookback window, heaviest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkUsage {
    pub addr: NetAddr,
    pub count: u32,
}

/// Attendance tally for one subject across a session series.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceCounts {
    pub attended: u32,
    pub total: u32,
}

impl AttendanceCounts {
    /// Fraction of recorded attempts that were accepted, or `None` with no history.
    pub fn rate(&self) -> Option<f64> {
        (self.total > 0).then(|| self.attended as f64 / self.total as f64)
    }
}

/// A slim scan view for the anomaly factor's movement check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanSample {
    pub recorded_at: Timestamp,
    pub point: Option<GeoPoint>,
    pub risk_score: u8,
}

/// Append access plus the bounded history reads each analyzer needs.
///
/// History reads are read-only from the engine's perspective; `append_scan`
/// is the single mutation, at the end of a validation.
pub trait ScanStore: Send + Sync {
    /// Persist one immutable check-in outcome.
    fn append_scan(&self, attempt: &ScanAttempt) -> Result<(), StoreError>;

    /// Distinct devices this subject used since `since`, heaviest first.
    fn device_usage(
        &self,
        subject: SubjectId,
        since: Timestamp,
    ) -> Result<Vec<DeviceUsage>, StoreError>;

    /// Location clusters (4-decimal granularity) since `since`, most frequent first.
    fn location_clusters(
        &self,
        subject: SubjectId,
        since: Timestamp,
    ) -> Result<Vec<LocationCluster>, StoreError>;

    /// Distinct network addresses since `since`, heaviest first.
    fn network_usage(
        &self,
        subject: SubjectId,
        since: Timestamp,
    ) -> Result<Vec<NetworkUsage>, StoreError>;

    /// Accepted/total tally for the subject across one series since `since`.
    fn attendance_counts(
        &self,
        subject: SubjectId,
        series: SeriesId,
        since: Timestamp,
    ) -> Result<AttendanceCounts, StoreError>;

    /// Most recent scans since `since`, newest first, at most `limit`.
    fn recent_scans(
        &self,
        subject: SubjectId,
        since: Timestamp,
        limit: usize,
    ) -> Result<Vec<ScanSample>, StoreError>;
}

/// Status of a token audit row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    Active,
    Invalidated,
}

/// Audit row written at issuance and updated once on explicit invalidation.
/// Expiry is implicit (issued_at + validity) and not written back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenAuditRecord {
    pub session: SessionId,
    pub issuer: rollcall_types::IssuerId,
    pub token_digest: String,
    pub nonce: String,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
    pub status: TokenStatus,
}

/// Append access to the token audit trail.
pub trait TokenAuditStore: Send + Sync {
    fn record_issued(&self, record: &TokenAuditRecord) -> Result<(), StoreError>;

    /// Mark the session's active rows invalidated (window close).
    fn record_invalidated(&self, session: SessionId, at: Timestamp) -> Result<(), StoreError>;
}

/// Append access to the alert queue consumed by the review workflow.
pub trait AlertStore: Send + Sync {
    fn append_alert(&self, alert: &Alert) -> Result<(), StoreError>;
}
