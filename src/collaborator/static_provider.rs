//! In-memory metrics provider with fixed per-route values

use crate::collaborator::{CollaboratorError, MetricsProvider};
use crate::routing::{CostComponent, Route, RouteMetrics};
use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Debug, Clone)]
struct RouteProfile {
    metrics: RouteMetrics,
    cost_components: Vec<CostComponent>,
}

/// Deterministic [`MetricsProvider`] backed by a concurrent map.
///
/// Useful for tests and for hosts that push telemetry in rather than
/// having the engine pull it. Values can be replaced while calls are in
/// flight; each fetch sees whatever is stored at that moment.
#[derive(Debug, Default)]
pub struct StaticMetricsProvider {
    profiles: DashMap<Route, RouteProfile>,
}

impl StaticMetricsProvider {
    pub fn new() -> Self {
        Self {
            profiles: DashMap::new(),
        }
    }

    /// Insert or replace a route's metrics and cost lines
    pub fn set_route(
        &self,
        route: impl Into<Route>,
        metrics: RouteMetrics,
        cost_components: Vec<CostComponent>,
    ) {
        self.profiles.insert(
            route.into(),
            RouteProfile {
                metrics,
                cost_components,
            },
        );
    }

    /// Replace a route's metrics, keeping any cost lines already stored
    pub fn set_metrics(&self, route: impl Into<Route>, metrics: RouteMetrics) {
        self.profiles
            .entry(route.into())
            .and_modify(|profile| profile.metrics = metrics)
            .or_insert_with(|| RouteProfile {
                metrics,
                cost_components: Vec::new(),
            });
    }

    /// Stop advertising a route. Returns true if it was known.
    pub fn remove(&self, route: &Route) -> bool {
        self.profiles.remove(route).is_some()
    }

    /// Known routes, sorted by id
    pub fn routes(&self) -> Vec<Route> {
        let mut routes: Vec<Route> = self.profiles.iter().map(|e| e.key().clone()).collect();
        routes.sort();
        routes
    }

    fn profile(&self, route: &Route) -> Result<RouteProfile, CollaboratorError> {
        self.profiles
            .get(route)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CollaboratorError::Unavailable(format!("no telemetry for route '{}'", route)))
    }
}

#[async_trait]
impl MetricsProvider for StaticMetricsProvider {
    async fn latency_of(&self, route: &Route) -> Result<f64, CollaboratorError> {
        Ok(self.profile(route)?.metrics.latency_ms)
    }

    async fn load_of(&self, route: &Route) -> Result<f64, CollaboratorError> {
        Ok(self.profile(route)?.metrics.load)
    }

    async fn reliability_of(&self, route: &Route) -> Result<f64, CollaboratorError> {
        Ok(self.profile(route)?.metrics.reliability)
    }

    async fn cost_components_of(
        &self,
        route: &Route,
    ) -> Result<Vec<CostComponent>, CollaboratorError> {
        Ok(self.profile(route)?.cost_components)
    }
}
