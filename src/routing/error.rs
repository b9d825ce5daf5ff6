//! Error types for route evaluation failures

use crate::routing::Route;
use thiserror::Error;

/// Errors that can occur while scoring, costing or measuring routes
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoutingError {
    /// A measurement was outside its documented range.
    /// Local to one route: that route is excluded and evaluation continues.
    #[error("Invalid {field} for route '{route}': {value}")]
    InvalidMetric {
        route: Route,
        field: &'static str,
        value: f64,
    },

    /// No viable candidate remained
    #[error("No routes available")]
    NoRoutesAvailable,

    /// The metrics provider failed or missed the deadline
    #[error("Metric '{metric}' unavailable for route '{route}': {reason}")]
    MetricUnavailable {
        route: Route,
        metric: &'static str,
        reason: String,
    },

    /// A cost component carried a negative or non-finite weight or cost
    #[error("Invalid cost input for route '{route}': {message}")]
    InvalidCost { route: Route, message: String },
}

impl RoutingError {
    /// True for failures confined to a single route
    pub fn is_route_local(&self) -> bool {
        matches!(
            self,
            RoutingError::InvalidMetric { .. } | RoutingError::InvalidCost { .. }
        )
    }
}
