//! Least-cost routing configuration

use crate::config::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Cost evaluation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    /// Cost added per millisecond of delay (lambda)
    pub delay_weight: f64,

    /// Weight applied to a cost component that carries none
    pub default_component_weight: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            delay_weight: 0.2,
            default_component_weight: 1.0,
        }
    }
}

impl CostConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.delay_weight.is_finite() || self.delay_weight < 0.0 {
            return Err(ConfigError::validation(
                "cost.delay_weight",
                "delay weight must be >= 0",
            ));
        }
        if !self.default_component_weight.is_finite() || self.default_component_weight < 0.0 {
            return Err(ConfigError::validation(
                "cost.default_component_weight",
                "component weight must be >= 0",
            ));
        }
        Ok(())
    }
}
