//! Structured logging setup
//!
//! The engine logs through `tracing`; this module turns a [`LoggingConfig`]
//! into an installed subscriber for hosts that do not bring their own.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build filter directives string from LoggingConfig
///
/// Constructs a tracing filter string that includes the base log level
/// and any component-specific log levels configured in the LoggingConfig.
///
/// # Examples
///
/// ```
/// use callroute::config::{LogFormat, LoggingConfig};
/// use callroute::logging::build_filter_directives;
/// use std::collections::HashMap;
///
/// let mut component_levels = HashMap::new();
/// component_levels.insert("orchestrator".to_string(), "debug".to_string());
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Pretty,
///     component_levels: Some(component_levels),
/// };
///
/// assert_eq!(build_filter_directives(&config), "info,callroute::orchestrator=debug");
/// ```
pub fn build_filter_directives(config: &LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    if let Some(component_levels) = &config.component_levels {
        let mut components: Vec<_> = component_levels.iter().collect();
        components.sort();
        for (component, level) in components {
            filter_str.push_str(&format!(",callroute::{}={}", component, level));
        }
    }

    filter_str
}

/// Initialize tracing based on configuration
///
/// `RUST_LOG` takes precedence over the configured directives. Fails if a
/// global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter_str = build_filter_directives(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn filter_without_components_is_base_level() {
        let config = LoggingConfig::default();
        assert_eq!(build_filter_directives(&config), "info");
    }

    #[test]
    fn filter_components_are_sorted() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            format: LogFormat::Json,
            component_levels: Some(HashMap::from([
                ("routing".to_string(), "trace".to_string()),
                ("anomaly".to_string(), "debug".to_string()),
            ])),
        };
        assert_eq!(
            build_filter_directives(&config),
            "warn,callroute::anomaly=debug,callroute::routing=trace"
        );
    }

    #[test]
    fn filter_directives_parse_as_env_filter() {
        let config = LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            component_levels: Some(HashMap::from([(
                "orchestrator".to_string(),
                "debug".to_string(),
            )])),
        };
        assert!(EnvFilter::try_new(build_filter_directives(&config)).is_ok());
    }
}
