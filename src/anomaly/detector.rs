//! Relative-deviation anomaly detection against tracked baselines

use crate::anomaly::{
    AnomalyError, BaselineTracker, AVG_DURATION, CALL_VOLUME, FAILURE_RATE, LATENCY,
};
use crate::config::{AnomalyConfig, ConfigError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// System metrics observed for one call. Absent fields are skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CallMetrics {
    pub call_volume: Option<f64>,
    pub avg_duration: Option<f64>,
    pub failure_rate: Option<f64>,
    pub latency: Option<f64>,
}

impl CallMetrics {
    /// Present fields in evaluation order
    pub fn observations(&self) -> Vec<(&'static str, f64)> {
        [
            (CALL_VOLUME, self.call_volume),
            (AVG_DURATION, self.avg_duration),
            (FAILURE_RATE, self.failure_rate),
            (LATENCY, self.latency),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }
}

/// A metric whose deviation from baseline exceeded its threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub metric_name: String,
    pub deviation_ratio: f64,
    pub threshold_used: f64,
    pub baseline_mean: f64,
    pub observed_value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of checking one observation
#[derive(Debug, Clone, PartialEq)]
pub enum DeviationReport {
    /// Nothing to compare against; never anomalous
    NoBaseline { metric_name: String },

    /// Deviation at or below threshold
    Within {
        metric_name: String,
        deviation_ratio: f64,
        threshold_used: f64,
    },

    Anomalous(Anomaly),
}

impl DeviationReport {
    pub fn is_anomalous(&self) -> bool {
        matches!(self, DeviationReport::Anomalous(_))
    }

    pub fn deviation_ratio(&self) -> Option<f64> {
        match self {
            DeviationReport::NoBaseline { .. } => None,
            DeviationReport::Within {
                deviation_ratio, ..
            } => Some(*deviation_ratio),
            DeviationReport::Anomalous(anomaly) => Some(anomaly.deviation_ratio),
        }
    }
}

/// Result of scanning a set of call metrics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnomalyScan {
    /// Flagged anomalies in evaluation order
    pub anomalies: Vec<Anomaly>,
    /// Metrics skipped because their baseline mean is zero
    pub degenerate: Vec<String>,
}

/// Flags observations whose relative deviation from baseline exceeds the
/// per-metric threshold.
pub struct AnomalyDetector {
    baselines: Arc<BaselineTracker>,
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(baselines: Arc<BaselineTracker>, config: AnomalyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { baselines, config })
    }

    pub fn baselines(&self) -> &Arc<BaselineTracker> {
        &self.baselines
    }

    /// Check one observation.
    ///
    /// `deviation = |observed - mean| / |mean|`; anomalous iff it exceeds
    /// the metric's threshold. A missing baseline is reported, not failed.
    ///
    /// # Errors
    ///
    /// `AnomalyError::NonFiniteObservation` for a NaN or infinite
    /// observation and `AnomalyError::DegenerateBaseline` when the baseline
    /// mean is exactly zero.
    pub fn detect(
        &self,
        metric_name: &str,
        observed_value: f64,
    ) -> Result<DeviationReport, AnomalyError> {
        if !observed_value.is_finite() {
            return Err(AnomalyError::NonFiniteObservation {
                metric: metric_name.to_string(),
                value: observed_value,
            });
        }

        let baseline = match self.baselines.current(metric_name) {
            Ok(baseline) => baseline,
            Err(AnomalyError::BaselineNotFound(_)) => {
                return Ok(DeviationReport::NoBaseline {
                    metric_name: metric_name.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        if baseline.mean == 0.0 {
            return Err(AnomalyError::DegenerateBaseline {
                metric: metric_name.to_string(),
            });
        }

        let deviation_ratio = (observed_value - baseline.mean).abs() / baseline.mean.abs();
        let threshold_used = self.config.threshold_for(metric_name);

        if deviation_ratio > threshold_used {
            Ok(DeviationReport::Anomalous(Anomaly {
                metric_name: metric_name.to_string(),
                deviation_ratio,
                threshold_used,
                baseline_mean: baseline.mean,
                observed_value,
                timestamp: Utc::now(),
            }))
        } else {
            Ok(DeviationReport::Within {
                metric_name: metric_name.to_string(),
                deviation_ratio,
                threshold_used,
            })
        }
    }

    /// Check every present field of `metrics`.
    ///
    /// Degenerate baselines are logged and listed in the scan instead of
    /// failing, so the call proceeds without anomaly data for that metric.
    pub fn process_call_metrics(&self, metrics: &CallMetrics) -> AnomalyScan {
        let mut scan = AnomalyScan::default();

        for (metric_name, observed) in metrics.observations() {
            match self.detect(metric_name, observed) {
                Ok(DeviationReport::Anomalous(anomaly)) => {
                    tracing::debug!(
                        metric = metric_name,
                        observed,
                        deviation = anomaly.deviation_ratio,
                        threshold = anomaly.threshold_used,
                        "Anomaly detected"
                    );
                    scan.anomalies.push(anomaly);
                }
                Ok(_) => {}
                Err(e @ AnomalyError::DegenerateBaseline { .. }) => {
                    tracing::warn!(metric = metric_name, error = %e, "Skipping anomaly check");
                    scan.degenerate.push(metric_name.to_string());
                }
                Err(e) => {
                    tracing::warn!(metric = metric_name, error = %e, "Discarding observation");
                }
            }
        }

        scan
    }
}
