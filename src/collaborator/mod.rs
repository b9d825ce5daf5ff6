//! Collaborator boundary.
//!
//! The engine consumes telemetry, caller verification, analytics and
//! session encryption through the traits in this module. Implementations
//! live with the host; this crate ships a deterministic
//! [`StaticMetricsProvider`] and a [`TracingAnalyticsSink`].

use async_trait::async_trait;
use std::future::Future;
use tokio::time::Instant;

pub mod error;
pub mod gather;
pub mod static_provider;
pub mod tracing_sink;
pub mod types;

pub use error::CollaboratorError;
pub use gather::{gather_route_metrics, RouteSample};
pub use static_provider::StaticMetricsProvider;
pub use tracing_sink::TracingAnalyticsSink;
pub use types::{
    CallRequest, CipherBundle, EncryptionSession, EventKind, LifecycleEvent, SessionKey,
    Verification,
};

use crate::routing::{CostComponent, Route};

/// Source of per-route instantaneous measurements.
///
/// # Object Safety
///
/// Designed to be used as `Arc<dyn MetricsProvider>`; async methods use
/// `async_trait`.
///
/// # Cancellation Safety
///
/// Callers bound every fetch with a deadline and may drop the future at
/// any point; implementations must not leave partial state behind.
#[async_trait]
pub trait MetricsProvider: Send + Sync + 'static {
    /// Current latency in milliseconds (expected `>= 0`)
    async fn latency_of(&self, route: &Route) -> Result<f64, CollaboratorError>;

    /// Current load ratio (expected in `[0, 1]`)
    async fn load_of(&self, route: &Route) -> Result<f64, CollaboratorError>;

    /// Current reliability ratio (expected in `[0, 1]`)
    async fn reliability_of(&self, route: &Route) -> Result<f64, CollaboratorError>;

    /// Cost lines for least-cost routing. Routes without tariffs cost only their delay.
    async fn cost_components_of(
        &self,
        _route: &Route,
    ) -> Result<Vec<CostComponent>, CollaboratorError> {
        Ok(Vec::new())
    }
}

/// Caller identity verification.
#[async_trait]
pub trait Authenticator: Send + Sync + 'static {
    async fn verify(&self, request: &CallRequest) -> Result<Verification, CollaboratorError>;
}

/// Best-effort append-only event log. Failures never affect the call.
#[async_trait]
pub trait AnalyticsSink: Send + Sync + 'static {
    async fn log_event(&self, event: &LifecycleEvent) -> Result<(), CollaboratorError>;
}

/// Issues encrypted sessions for routed calls. The engine passes only the
/// call id and route decision through and never reads key material.
#[async_trait]
pub trait SessionEncryptor: Send + Sync + 'static {
    async fn issue_session(&self) -> Result<EncryptionSession, CollaboratorError>;

    async fn encrypt(
        &self,
        session: &EncryptionSession,
        payload: &[u8],
    ) -> Result<CipherBundle, CollaboratorError>;
}

/// Run a collaborator call, failing with `CollaboratorError::Timeout` once
/// `deadline` passes.
pub async fn with_deadline<T, F>(deadline: Instant, call: F) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    let budget = deadline.saturating_duration_since(Instant::now());
    match tokio::time::timeout_at(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(CollaboratorError::Timeout(budget.as_millis() as u64)),
    }
}
