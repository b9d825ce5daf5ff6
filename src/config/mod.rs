//! Configuration module
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. Environment variables (`CALLROUTE_*`)
//! 2. Configuration file (TOML)
//! 3. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use callroute::config::EngineConfig;
//!
//! let config = EngineConfig::default();
//! assert_eq!(config.orchestrator.top_k, 3);
//!
//! let toml = r#"
//! [orchestrator]
//! top_k = 5
//! "#;
//! let config: EngineConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.orchestrator.top_k, 5);
//! assert_eq!(config.scoring.latency_weight, 0.4);
//! ```

pub mod anomaly;
pub mod cost;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod risk;
pub mod scoring;

pub use anomaly::AnomalyConfig;
pub use cost::CostConfig;
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use orchestrator::OrchestratorConfig;
pub use risk::RiskConfig;
pub use scoring::{ScoringConfig, WEIGHT_SUM_EPSILON};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unified configuration for the decision engine.
///
/// One section per component; every section falls back to its defaults
/// when absent from the file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Dynamic call distribution weights
    pub scoring: ScoringConfig,
    /// Least-cost routing parameters
    pub cost: CostConfig,
    /// Deviation thresholds per metric
    pub anomaly: AnomalyConfig,
    /// Risk weights and level bands
    pub risk: RiskConfig,
    /// Call pipeline behaviour
    pub orchestrator: OrchestratorConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supports CALLROUTE_* environment variables for common settings.
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(level) = std::env::var("CALLROUTE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("CALLROUTE_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        if let Ok(deadline) = std::env::var("CALLROUTE_DEADLINE_MS") {
            if let Ok(ms) = deadline.parse() {
                self.orchestrator.deadline_ms = ms;
            }
        }
        if let Ok(top_k) = std::env::var("CALLROUTE_TOP_K") {
            if let Ok(k) = top_k.parse() {
                self.orchestrator.top_k = k;
            }
        }
        if let Ok(strategy) = std::env::var("CALLROUTE_STRATEGY") {
            if let Ok(s) = strategy.parse() {
                self.orchestrator.strategy = s;
            }
        }

        self
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scoring.validate()?;
        self.cost.validate()?;
        self.anomaly.validate()?;
        self.risk.validate()?;
        self.orchestrator.validate()?;
        Ok(())
    }
}
