//! Shared test utilities for callroute integration tests.
//!
//! Provides deterministic collaborator doubles and builders for a fully
//! wired orchestrator.

#![allow(dead_code)]

use async_trait::async_trait;
use callroute::anomaly::BaselineTracker;
use callroute::collaborator::{
    AnalyticsSink, Authenticator, CallRequest, CollaboratorError, EventKind, LifecycleEvent,
    MetricsProvider, StaticMetricsProvider, Verification,
};
use callroute::config::EngineConfig;
use callroute::orchestrator::{Collaborators, RouteDecisionOrchestrator, SessionStore};
use callroute::routing::{CostComponent, Route, RouteMetrics};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =============================================================================
// Well-Known Test Constants
// =============================================================================

/// Best score (0.915), cost 14.0
pub const TRUNK_FAST: &str = "trunk-fast";

/// Score 0.834, cheapest at 12.8
pub const TRUNK_CHEAP: &str = "trunk-cheap";

/// Score 0.58, cost 25.0
pub const TRUNK_SLOW: &str = "trunk-slow";

pub const CALLER: &str = "+15550100";
pub const CALLEE: &str = "+15550199";

// =============================================================================
// Collaborator Doubles
// =============================================================================

/// Verifies every caller except the blocked ones, optionally after a delay
pub struct ListAuthenticator {
    blocked: HashSet<String>,
    delay: Duration,
}

impl ListAuthenticator {
    pub fn allow_all() -> Self {
        Self {
            blocked: HashSet::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn blocking(callers: &[&str]) -> Self {
        Self {
            blocked: callers.iter().map(|c| c.to_string()).collect(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Authenticator for ListAuthenticator {
    async fn verify(&self, request: &CallRequest) -> Result<Verification, CollaboratorError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.blocked.contains(&request.caller) {
            Ok(Verification::rejected("CALLER_BLOCKED"))
        } else {
            Ok(Verification::verified("A"))
        }
    }
}

/// Keeps every event it receives
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingSink {
    pub fn events_for(&self, call_id: &str) -> Vec<EventKind> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.call_id == call_id)
            .map(|e| e.kind)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

#[async_trait]
impl AnalyticsSink for RecordingSink {
    async fn log_event(&self, event: &LifecycleEvent) -> Result<(), CollaboratorError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Static telemetry where some routes' probes are down
pub struct PartialOutageProvider {
    inner: StaticMetricsProvider,
    down: HashSet<Route>,
}

impl PartialOutageProvider {
    pub fn new(inner: StaticMetricsProvider, down: &[&str]) -> Self {
        Self {
            inner,
            down: down.iter().map(|r| Route::from(*r)).collect(),
        }
    }

    fn check(&self, route: &Route) -> Result<(), CollaboratorError> {
        if self.down.contains(route) {
            Err(CollaboratorError::Network(format!("probe for {} unreachable", route)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MetricsProvider for PartialOutageProvider {
    async fn latency_of(&self, route: &Route) -> Result<f64, CollaboratorError> {
        self.check(route)?;
        self.inner.latency_of(route).await
    }

    async fn load_of(&self, route: &Route) -> Result<f64, CollaboratorError> {
        self.check(route)?;
        self.inner.load_of(route).await
    }

    async fn reliability_of(&self, route: &Route) -> Result<f64, CollaboratorError> {
        self.check(route)?;
        self.inner.reliability_of(route).await
    }

    async fn cost_components_of(
        &self,
        route: &Route,
    ) -> Result<Vec<CostComponent>, CollaboratorError> {
        self.check(route)?;
        self.inner.cost_components_of(route).await
    }
}

// =============================================================================
// Builders
// =============================================================================

/// Provider advertising the three well-known trunks
pub fn make_provider() -> StaticMetricsProvider {
    let provider = StaticMetricsProvider::new();
    provider.set_route(
        TRUNK_FAST,
        RouteMetrics::new(20.0, 0.1, 0.95),
        vec![CostComponent::new(10.0)],
    );
    provider.set_route(
        TRUNK_CHEAP,
        RouteMetrics::new(50.0, 0.2, 0.98),
        vec![
            CostComponent::weighted(0.5, 4.0),
            CostComponent::weighted(0.3, 2.0),
            CostComponent::weighted(0.2, 1.0),
        ],
    );
    provider.set_route(
        TRUNK_SLOW,
        RouteMetrics::new(120.0, 0.5, 0.90),
        vec![CostComponent::new(1.0)],
    );
    provider
}

pub fn all_trunks() -> Vec<Route> {
    vec![
        Route::from(TRUNK_FAST),
        Route::from(TRUNK_CHEAP),
        Route::from(TRUNK_SLOW),
    ]
}

pub fn make_request(call_id: &str) -> CallRequest {
    CallRequest::new(call_id, CALLER, CALLEE)
}

/// A wired orchestrator plus handles on its shared state
pub struct TestEngine {
    pub orchestrator: Arc<RouteDecisionOrchestrator>,
    pub baselines: Arc<BaselineTracker>,
    pub sink: Arc<RecordingSink>,
}

pub fn make_engine_with(
    config: &EngineConfig,
    metrics: Arc<dyn MetricsProvider>,
    authenticator: Arc<dyn Authenticator>,
) -> TestEngine {
    let baselines = Arc::new(BaselineTracker::new());
    let sink = Arc::new(RecordingSink::default());
    let collaborators = Collaborators::new(metrics, authenticator).with_analytics(sink.clone());
    let orchestrator = RouteDecisionOrchestrator::new(
        config,
        baselines.clone(),
        Arc::new(SessionStore::new()),
        collaborators,
    )
    .expect("valid test configuration");

    TestEngine {
        orchestrator: Arc::new(orchestrator),
        baselines,
        sink,
    }
}

pub fn make_engine() -> TestEngine {
    make_engine_with(
        &EngineConfig::default(),
        Arc::new(make_provider()),
        Arc::new(ListAuthenticator::allow_all()),
    )
}
