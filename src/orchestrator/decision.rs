//! Outcomes returned to the host

use super::AbortReason;
use crate::anomaly::RiskAssessment;
use crate::routing::{Route, RouteCost, RouteMetrics, SelectionStrategy};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Encrypted copy of a routing decision. Key material never reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecureChannel {
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
    pub ciphertext: Vec<u8>,
}

/// A call cleared to proceed on `route`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteDecision {
    pub call_id: String,
    pub route: Route,
    pub score: f64,
    pub metrics: RouteMetrics,
    pub cost: RouteCost,
    pub strategy: SelectionStrategy,
    /// Candidates the final pick was made from
    pub considered: usize,
    pub attestation_level: Option<String>,
    pub risk: RiskAssessment,
    pub degenerate_metrics: Vec<String>,
    pub secure_channel: Option<SecureChannel>,
}

/// Result of running a call through the pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallDecision {
    Proceed(RouteDecision),
    Aborted { call_id: String, reason: AbortReason },
}

impl CallDecision {
    pub fn call_id(&self) -> &str {
        match self {
            CallDecision::Proceed(decision) => &decision.call_id,
            CallDecision::Aborted { call_id, .. } => call_id,
        }
    }

    pub fn is_proceed(&self) -> bool {
        matches!(self, CallDecision::Proceed(_))
    }

    pub fn route(&self) -> Option<&Route> {
        match self {
            CallDecision::Proceed(decision) => Some(&decision.route),
            CallDecision::Aborted { .. } => None,
        }
    }

    pub fn abort_reason(&self) -> Option<&AbortReason> {
        match self {
            CallDecision::Proceed(_) => None,
            CallDecision::Aborted { reason, .. } => Some(reason),
        }
    }
}

/// Final record of a completed call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedCall {
    pub call_id: String,
    pub route: Option<Route>,
    pub route_metrics: Option<RouteMetrics>,
    pub duration: Duration,
    pub last_risk_assessment: Option<RiskAssessment>,
    pub completed_at: DateTime<Utc>,
}
