//! Logging configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Pretty-printed logs for humans
    #[default]
    Pretty,
    /// JSON logs for machine parsing
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

/// Engine log levels.
///
/// `component_levels` keys are module names under `callroute::`
/// (`orchestrator`, `routing`, `anomaly`, `collaborator`). Per-route scoring
/// detail logs at `trace`, so raising `routing` is the usual way to see why
/// a trunk lost.
///
/// ```
/// use callroute::config::{LogFormat, LoggingConfig};
///
/// let config: LoggingConfig = toml::from_str(
///     r#"
///     level = "warn"
///     format = "json"
///
///     [component_levels]
///     routing = "trace"
///     anomaly = "debug"
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(config.format, LogFormat::Json);
/// assert_eq!(config.level_for("routing"), "trace");
/// assert_eq!(config.level_for("orchestrator"), "warn");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_levels: Option<HashMap<String, String>>,
}

impl LoggingConfig {
    /// Effective level for one engine module
    pub fn level_for(&self, component: &str) -> &str {
        self.component_levels
            .as_ref()
            .and_then(|levels| levels.get(component))
            .map(String::as_str)
            .unwrap_or(self.level.as_str())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            component_levels: None,
        }
    }
}
