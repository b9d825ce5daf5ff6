//! Anomaly detection thresholds

use crate::config::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-metric deviation thresholds.
///
/// A metric is anomalous when `|observed - mean| / mean` exceeds its
/// threshold. Metrics without an entry use `default_threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    pub default_threshold: f64,
    pub thresholds: HashMap<String, f64>,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            default_threshold: 0.2,
            thresholds: HashMap::new(),
        }
    }
}

impl AnomalyConfig {
    /// Threshold for a metric, falling back to the default
    pub fn threshold_for(&self, metric: &str) -> f64 {
        self.thresholds
            .get(metric)
            .copied()
            .unwrap_or(self.default_threshold)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.default_threshold.is_finite() || self.default_threshold <= 0.0 {
            return Err(ConfigError::validation(
                "anomaly.default_threshold",
                "threshold must be positive",
            ));
        }
        for (metric, threshold) in &self.thresholds {
            if !threshold.is_finite() || *threshold <= 0.0 {
                return Err(ConfigError::validation(
                    &format!("anomaly.thresholds.{}", metric),
                    "threshold must be positive",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlisted_metric_uses_default() {
        let config = AnomalyConfig::default();
        assert_eq!(config.threshold_for("call_volume"), 0.2);
    }

    #[test]
    fn listed_metric_uses_override() {
        let mut config = AnomalyConfig::default();
        config.thresholds.insert("failure_rate".to_string(), 0.05);
        assert_eq!(config.threshold_for("failure_rate"), 0.05);
        assert_eq!(config.threshold_for("latency"), 0.2);
    }

    #[test]
    fn rejects_zero_threshold() {
        let mut config = AnomalyConfig::default();
        config.thresholds.insert("latency".to_string(), 0.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { ref field, .. }) if field == "anomaly.thresholds.latency"
        ));
    }
}
