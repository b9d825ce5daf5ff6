//! Per-metric statistical baselines.
//!
//! Baselines are replaced wholesale from a caller-supplied history window;
//! there is no incremental update path.

use crate::anomaly::AnomalyError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

/// Mean and population standard deviation of one metric's history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricBaseline {
    pub metric_name: String,
    pub mean: f64,
    pub std_dev: f64,
    /// Length of the history window the baseline was computed from
    pub sample_count: usize,
    pub last_updated: DateTime<Utc>,
}

impl MetricBaseline {
    /// Compute a baseline from a non-empty history.
    pub fn from_history(metric_name: &str, values: &[f64]) -> Result<Self, AnomalyError> {
        if values.is_empty() {
            return Err(AnomalyError::EmptyHistory(metric_name.to_string()));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(AnomalyError::NonFiniteValue {
                metric: metric_name.to_string(),
                value: *bad,
            });
        }

        let count = values.len() as f64;
        let mean = values.iter().sum::<f64>() / count;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

        Ok(Self {
            metric_name: metric_name.to_string(),
            mean,
            std_dev: variance.sqrt(),
            sample_count: values.len(),
            last_updated: Utc::now(),
        })
    }
}

/// Thread-safe store of metric baselines, shared by every call in flight.
///
/// Read-mostly: lookups take a shard read lock and clone the whole entry,
/// updates swap the whole entry under the shard write lock. A reader sees
/// either the previous baseline or the new one, never a mix of the two.
#[derive(Debug, Default)]
pub struct BaselineTracker {
    baselines: DashMap<String, MetricBaseline>,
}

impl BaselineTracker {
    pub fn new() -> Self {
        Self {
            baselines: DashMap::new(),
        }
    }

    /// Recompute and replace the baseline for `metric_name`.
    ///
    /// # Errors
    ///
    /// Returns `AnomalyError::EmptyHistory` for an empty history and
    /// `AnomalyError::NonFiniteValue` if any value is NaN or infinite; the
    /// prior baseline is left untouched in both cases.
    pub fn update(
        &self,
        metric_name: &str,
        historical_values: &[f64],
    ) -> Result<MetricBaseline, AnomalyError> {
        let baseline = MetricBaseline::from_history(metric_name, historical_values)?;

        tracing::debug!(
            metric = metric_name,
            mean = baseline.mean,
            std_dev = baseline.std_dev,
            samples = baseline.sample_count,
            "Baseline updated"
        );

        self.baselines
            .insert(metric_name.to_string(), baseline.clone());
        Ok(baseline)
    }

    /// Current baseline for a metric.
    pub fn current(&self, metric_name: &str) -> Result<MetricBaseline, AnomalyError> {
        self.baselines
            .get(metric_name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AnomalyError::BaselineNotFound(metric_name.to_string()))
    }

    /// Drop a metric's baseline, returning it if one existed
    pub fn remove(&self, metric_name: &str) -> Option<MetricBaseline> {
        self.baselines.remove(metric_name).map(|(_, b)| b)
    }

    /// Names of all tracked metrics, sorted
    pub fn metric_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.baselines.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }
}
