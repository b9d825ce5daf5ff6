//! Default analytics sink: lifecycle events as structured log records

use crate::collaborator::{AnalyticsSink, CollaboratorError, LifecycleEvent};
use async_trait::async_trait;

/// Writes each lifecycle event on the `callroute::analytics` target.
///
/// Never fails; durable storage is left to hosts that supply their own sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnalyticsSink;

#[async_trait]
impl AnalyticsSink for TracingAnalyticsSink {
    async fn log_event(&self, event: &LifecycleEvent) -> Result<(), CollaboratorError> {
        tracing::info!(
            target: "callroute::analytics",
            event_id = %event.event_id,
            call_id = %event.call_id,
            kind = event.kind.as_str(),
            timestamp = %event.timestamp.to_rfc3339(),
            attributes = %event.attributes,
            "Lifecycle event"
        );
        Ok(())
    }
}
