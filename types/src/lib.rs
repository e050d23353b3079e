//! Fundamental types for the rollcall attendance engine.
//!
//! This crate defines the types shared across every other crate in the
//! workspace: identifiers, timestamps, coordinates, risk tiers, the rejection
//! taxonomy, engine parameters, and the domain records the engine reads and
//! appends (sessions, scan attempts, alerts).

pub mod alert;
pub mod geo;
pub mod id;
pub mod params;
pub mod reject;
pub mod scan;
pub mod session;
pub mod tier;
pub mod time;

pub use alert::Alert;
pub use geo::GeoPoint;
pub use id::{DeviceHash, IssuerId, NetAddr, SeriesId, SessionId, SubjectId};
pub use params::EngineParams;
pub use reject::RejectReason;
pub use scan::{CheckInContext, ScanAttempt, ScanOutcome};
pub use session::SessionInfo;
pub use tier::{RiskTier, Severity, TierCounts};
pub use time::Timestamp;
