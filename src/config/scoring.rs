//! Route scoring configuration

use crate::config::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Tolerance applied when checking that scoring weights sum to one
pub const WEIGHT_SUM_EPSILON: f64 = 1e-6;

/// Weights and normalisation bounds for dynamic call distribution.
///
/// `score = latency_weight * norm_latency + load_weight * (1 - load)
///        + reliability_weight * reliability`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight for normalised latency (alpha)
    pub latency_weight: f64,

    /// Weight for spare capacity, `1 - load` (beta)
    pub load_weight: f64,

    /// Weight for reliability (gamma)
    pub reliability_weight: f64,

    /// Latency at or above which a route earns no latency credit
    pub latency_ceiling_ms: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            latency_weight: 0.4,
            load_weight: 0.3,
            reliability_weight: 0.3,
            latency_ceiling_ms: 200.0,
        }
    }
}

impl ScoringConfig {
    /// Validate weights and ceiling.
    ///
    /// Weights must be non-negative and sum to 1 within [`WEIGHT_SUM_EPSILON`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, weight) in [
            ("scoring.latency_weight", self.latency_weight),
            ("scoring.load_weight", self.load_weight),
            ("scoring.reliability_weight", self.reliability_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::validation(
                    field,
                    format!("weight must be a non-negative number, got {}", weight),
                ));
            }
        }

        let sum = self.latency_weight + self.load_weight + self.reliability_weight;
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(ConfigError::validation(
                "scoring",
                format!("scoring weights must sum to 1, got {}", sum),
            ));
        }

        if !self.latency_ceiling_ms.is_finite() || self.latency_ceiling_ms <= 0.0 {
            return Err(ConfigError::validation(
                "scoring.latency_ceiling_ms",
                "latency ceiling must be positive",
            ));
        }

        Ok(())
    }
}
