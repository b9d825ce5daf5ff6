//! Route identity and per-evaluation measurement types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque route identifier, used only as a key into metric and cost lookups.
///
/// Ordering is lexicographic on the identifier; it breaks ties between
/// routes of equal merit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Route(String);

impl Route {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Route {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for Route {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Instantaneous measurements for one route.
///
/// Captured fresh for every evaluation and never mutated afterwards.
/// Ranges (`latency_ms >= 0`, `load` and `reliability` in `[0, 1]`) are
/// checked by the scorer, not here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteMetrics {
    pub latency_ms: f64,
    pub load: f64,
    pub reliability: f64,
}

impl RouteMetrics {
    pub fn new(latency_ms: f64, load: f64, reliability: f64) -> Self {
        Self {
            latency_ms,
            load,
            reliability,
        }
    }
}

/// A scored candidate, valid only for the evaluation that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedRoute {
    pub route: Route,
    pub score: f64,
    pub metrics: RouteMetrics,
}

/// One monetary or resource cost line for a route.
///
/// A missing weight resolves to the evaluator's default (1.0 unless configured).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostComponent {
    pub weight: Option<f64>,
    pub cost: f64,
}

impl CostComponent {
    /// Component with the default weight
    pub fn new(cost: f64) -> Self {
        Self { weight: None, cost }
    }

    pub fn weighted(weight: f64, cost: f64) -> Self {
        Self {
            weight: Some(weight),
            cost,
        }
    }
}

/// Evaluated cost of a route
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteCost {
    pub route: Route,
    /// `sum(weight * cost) + delay_weight * delay_ms`
    pub total_cost: f64,
    /// Resolved `(weight, cost)` pairs in input order
    pub component_costs: Vec<(f64, f64)>,
    pub delay_ms: f64,
}
