//! Risk scoring weights and level bands

use crate::anomaly::{AVG_DURATION, CALL_VOLUME, FAILURE_RATE};
use crate::config::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Risk aggregation parameters.
///
/// Levels: `score < medium_threshold` is low, `score < high_threshold` is
/// medium, anything else is high.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Per-metric weight applied to each anomaly's deviation
    pub weights: HashMap<String, f64>,

    /// Weight for metrics missing from `weights`
    pub default_weight: f64,

    pub medium_threshold: f64,
    pub high_threshold: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        let weights = HashMap::from([
            (CALL_VOLUME.to_string(), 0.3),
            (AVG_DURATION.to_string(), 0.2),
            (FAILURE_RATE.to_string(), 0.5),
        ]);
        Self {
            weights,
            default_weight: 0.2,
            medium_threshold: 0.3,
            high_threshold: 0.7,
        }
    }
}

impl RiskConfig {
    pub fn weight_for(&self, metric: &str) -> f64 {
        self.weights
            .get(metric)
            .copied()
            .unwrap_or(self.default_weight)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.default_weight.is_finite() || self.default_weight < 0.0 {
            return Err(ConfigError::validation(
                "risk.default_weight",
                "weight must be >= 0",
            ));
        }
        for (metric, weight) in &self.weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(ConfigError::validation(
                    &format!("risk.weights.{}", metric),
                    "weight must be >= 0",
                ));
            }
        }
        let bands_ordered = 0.0 <= self.medium_threshold
            && self.medium_threshold <= self.high_threshold
            && self.high_threshold <= 1.0;
        if !bands_ordered {
            return Err(ConfigError::validation(
                "risk",
                format!(
                    "thresholds must satisfy 0 <= medium <= high <= 1, got medium={} high={}",
                    self.medium_threshold, self.high_threshold
                ),
            ));
        }
        Ok(())
    }
}
