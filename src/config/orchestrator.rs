//! Call pipeline configuration

use crate::config::error::ConfigError;
use crate::routing::SelectionStrategy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// How the final route is picked from the scored candidates
    pub strategy: SelectionStrategy,

    /// Number of best-scored routes handed to cost evaluation
    pub top_k: usize,

    /// Default per-call deadline for metric fetches and collaborator calls
    pub deadline_ms: u64,

    /// Upper bound on a single analytics append
    pub analytics_timeout_ms: u64,

    /// Issue an encrypted session for each routed call when an encryptor is present
    pub encrypt_decisions: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            strategy: SelectionStrategy::LeastCost,
            top_k: 3,
            deadline_ms: 500,
            analytics_timeout_ms: 250,
            encrypt_decisions: true,
        }
    }
}

impl OrchestratorConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn analytics_timeout(&self) -> Duration {
        Duration::from_millis(self.analytics_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::validation(
                "orchestrator.top_k",
                "top_k must be at least 1",
            ));
        }
        if self.deadline_ms == 0 {
            return Err(ConfigError::validation(
                "orchestrator.deadline_ms",
                "deadline must be non-zero",
            ));
        }
        Ok(())
    }
}
