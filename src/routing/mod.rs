//! Route evaluation: scoring, cost and final selection
//!
//! This module ranks candidate routes for a call by live measurements
//! (dynamic call distribution), prices the best of them (least-cost
//! routing) and picks one according to the configured strategy.

pub mod cost;
pub mod error;
pub mod scoring;
pub mod strategies;
pub mod types;

pub use cost::CostEvaluator;
pub use error::RoutingError;
pub use scoring::RouteScorer;
pub use strategies::{RouteSelection, SelectionStrategy};
pub use types::{CostComponent, Route, RouteCost, RouteMetrics, WeightedRoute};
