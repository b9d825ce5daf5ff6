//! Parallel per-route metric gathering bounded by a deadline

use crate::collaborator::{with_deadline, CollaboratorError, MetricsProvider};
use crate::routing::{CostComponent, Route, RouteMetrics, RoutingError};
use futures::future::join_all;
use std::collections::BTreeSet;
use tokio::time::Instant;

/// Everything fetched for one route in one evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSample {
    pub route: Route,
    pub metrics: RouteMetrics,
    pub cost_components: Vec<CostComponent>,
}

/// Fetch measurements and cost lines for every distinct route concurrently.
///
/// Every fetch is awaited before this returns, so no request for the call
/// is still in flight when ranking starts. Samples come back in route id
/// order. Values are passed through unvalidated; range checks belong to
/// the scorer.
///
/// # Errors
///
/// `RoutingError::MetricUnavailable` for the first route (in id order)
/// whose provider call failed or missed `deadline`.
pub async fn gather_route_metrics(
    provider: &dyn MetricsProvider,
    routes: &[Route],
    deadline: Instant,
) -> Result<Vec<RouteSample>, RoutingError> {
    let unique: BTreeSet<&Route> = routes.iter().collect();
    let results = join_all(
        unique
            .into_iter()
            .map(|route| fetch_route(provider, route, deadline)),
    )
    .await;

    results.into_iter().collect()
}

async fn fetch_route(
    provider: &dyn MetricsProvider,
    route: &Route,
    deadline: Instant,
) -> Result<RouteSample, RoutingError> {
    let (latency, load, reliability, costs) = futures::join!(
        with_deadline(deadline, provider.latency_of(route)),
        with_deadline(deadline, provider.load_of(route)),
        with_deadline(deadline, provider.reliability_of(route)),
        with_deadline(deadline, provider.cost_components_of(route)),
    );

    let metrics = RouteMetrics::new(
        latency.map_err(|e| unavailable(route, "latency", e))?,
        load.map_err(|e| unavailable(route, "load", e))?,
        reliability.map_err(|e| unavailable(route, "reliability", e))?,
    );
    let cost_components = costs.map_err(|e| unavailable(route, "cost", e))?;

    tracing::trace!(
        route = %route,
        latency_ms = metrics.latency_ms,
        load = metrics.load,
        reliability = metrics.reliability,
        cost_lines = cost_components.len(),
        "Route metrics gathered"
    );

    Ok(RouteSample {
        route: route.clone(),
        metrics,
        cost_components,
    })
}

fn unavailable(route: &Route, metric: &'static str, error: CollaboratorError) -> RoutingError {
    tracing::debug!(route = %route, metric, error = %error, "Metric fetch failed");
    RoutingError::MetricUnavailable {
        route: route.clone(),
        metric,
        reason: error.to_string(),
    }
}
