//! Risk factor analyzers and the composite scoring engine.
//!
//! Five independent analyzers (device, location, network, temporal, anomaly)
//! each read a bounded slice of the subject's history and return a clamped
//! sub-score with flags. The engine combines them through a declarative
//! `(weight, analyzer)` list — each analyzer is unit-testable on its own and
//! the aggregation logic is tested once, generically.

pub mod analyzer;
pub mod anomaly;
pub mod device;
pub mod engine;
pub mod location;
pub mod network;
pub mod temporal;

pub use analyzer::{AttemptContext, FactorScore, RiskAnalyzer};
pub use anomaly::AnomalyFactor;
pub use device::DeviceFactor;
pub use engine::{FactorReport, RiskAssessment, RiskEngine};
pub use location::LocationFactor;
pub use network::NetworkFactor;
pub use temporal::TemporalFactor;
