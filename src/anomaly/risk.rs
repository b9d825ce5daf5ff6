//! Aggregation of anomalies into a single risk level

use crate::anomaly::Anomaly;
use crate::config::{ConfigError, RiskConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse risk bucket that gates call continuation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable risk verdict for one set of anomalies
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    /// Weighted deviation sum clamped to `[0, 1]`
    pub score: f64,
    pub level: RiskLevel,
    pub anomaly_count: usize,
    pub timestamp: DateTime<Utc>,
}

/// Folds anomalies into a risk score with per-metric weights.
///
/// The score is monotone non-decreasing in every anomaly's deviation.
#[derive(Debug, Clone)]
pub struct RiskScorer {
    config: RiskConfig,
}

impl RiskScorer {
    pub fn new(config: RiskConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn score(&self, anomalies: &[Anomaly]) -> RiskAssessment {
        let raw: f64 = anomalies
            .iter()
            .map(|a| (a.deviation_ratio * self.config.weight_for(&a.metric_name)).max(0.0))
            .sum();
        let score = raw.clamp(0.0, 1.0);

        RiskAssessment {
            score,
            level: self.level_for(score),
            anomaly_count: anomalies.len(),
            timestamp: Utc::now(),
        }
    }

    /// Band a score: each band includes its lower bound and excludes its upper
    pub fn level_for(&self, score: f64) -> RiskLevel {
        if score < self.config.medium_threshold {
            RiskLevel::Low
        } else if score < self.config.high_threshold {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}
