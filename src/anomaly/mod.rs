//! Statistical baselines, deviation detection and risk aggregation
//!
//! Call counters feed [`BaselineTracker`]; [`AnomalyDetector`] compares
//! fresh observations against those baselines and [`RiskScorer`] folds
//! the resulting anomalies into one gating level.

pub mod baseline;
pub mod detector;
pub mod error;
pub mod risk;

pub use baseline::{BaselineTracker, MetricBaseline};
pub use detector::{Anomaly, AnomalyDetector, AnomalyScan, CallMetrics, DeviationReport};
pub use error::AnomalyError;
pub use risk::{RiskAssessment, RiskLevel, RiskScorer};

/// Calls observed in the statistics window
pub const CALL_VOLUME: &str = "call_volume";

/// Mean completed call duration in milliseconds
pub const AVG_DURATION: &str = "avg_duration";

/// Share of finished calls that aborted
pub const FAILURE_RATE: &str = "failure_rate";

/// Latency of the route selected for a call
pub const LATENCY: &str = "latency";
