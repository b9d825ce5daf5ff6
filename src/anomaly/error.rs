//! Error types for baseline and anomaly operations

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnomalyError {
    #[error("No baseline recorded for metric '{0}'")]
    BaselineNotFound(String),

    #[error("Baseline update for metric '{0}' needs at least one value")]
    EmptyHistory(String),

    #[error("Baseline history for metric '{metric}' contains non-finite value {value}")]
    NonFiniteValue { metric: String, value: f64 },

    #[error("Observed value {value} for metric '{metric}' is not a finite number")]
    NonFiniteObservation { metric: String, value: f64 },

    /// Relative deviation is undefined against a zero mean
    #[error("Baseline for metric '{metric}' has zero mean; relative deviation is undefined")]
    DegenerateBaseline { metric: String },
}
