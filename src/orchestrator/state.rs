//! Call lifecycle states and terminal reasons

use crate::routing::{Route, RoutingError};
use serde::Serialize;
use std::fmt;

/// Why a call ended without completing. Every aborted call carries one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum AbortReason {
    /// Authenticator answered `verified = false`
    VerificationFailed { error_code: Option<String> },

    /// No candidate survived scoring and costing
    NoRoutesAvailable,

    /// Risk assessment reached the high band
    HighRiskDetected { score: f64 },

    /// Caller cancelled the call in flight
    Cancelled,

    /// Metrics provider failed or missed the deadline
    MetricUnavailable {
        route: Route,
        metric: String,
        message: String,
    },

    /// Any other collaborator failure, including host-reported ones
    CollaboratorFailure {
        collaborator: String,
        message: String,
    },
}

impl AbortReason {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            AbortReason::VerificationFailed { .. } => "verification_failed",
            AbortReason::NoRoutesAvailable => "no_routes_available",
            AbortReason::HighRiskDetected { .. } => "high_risk_detected",
            AbortReason::Cancelled => "cancelled",
            AbortReason::MetricUnavailable { .. } => "metric_unavailable",
            AbortReason::CollaboratorFailure { .. } => "collaborator_failure",
        }
    }

    pub fn collaborator(collaborator: &str, message: impl Into<String>) -> Self {
        AbortReason::CollaboratorFailure {
            collaborator: collaborator.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::VerificationFailed {
                error_code: Some(code),
            } => write!(f, "verification failed ({})", code),
            AbortReason::VerificationFailed { error_code: None } => {
                write!(f, "verification failed")
            }
            AbortReason::NoRoutesAvailable => write!(f, "no routes available"),
            AbortReason::HighRiskDetected { score } => {
                write!(f, "high risk detected (score {:.3})", score)
            }
            AbortReason::Cancelled => write!(f, "cancelled"),
            AbortReason::MetricUnavailable {
                route,
                metric,
                message,
            } => write!(f, "{} unavailable for route '{}': {}", metric, route, message),
            AbortReason::CollaboratorFailure {
                collaborator,
                message,
            } => write!(f, "{} failed: {}", collaborator, message),
        }
    }
}

impl From<RoutingError> for AbortReason {
    fn from(error: RoutingError) -> Self {
        match error {
            RoutingError::MetricUnavailable {
                route,
                metric,
                reason,
            } => AbortReason::MetricUnavailable {
                route,
                metric: metric.to_string(),
                message: reason,
            },
            // Route-local failures only escape once they have emptied the candidate set
            RoutingError::NoRoutesAvailable
            | RoutingError::InvalidMetric { .. }
            | RoutingError::InvalidCost { .. } => AbortReason::NoRoutesAvailable,
        }
    }
}

/// Position of a call in `Pending -> Verified -> Routed -> Monitoring -> Completed`.
///
/// Any live state may jump to `Aborted`. Terminal states have no successors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum CallState {
    Pending,
    Verified,
    Routed,
    Monitoring,
    Completed,
    Aborted(AbortReason),
}

impl CallState {
    pub fn name(&self) -> &'static str {
        match self {
            CallState::Pending => "pending",
            CallState::Verified => "verified",
            CallState::Routed => "routed",
            CallState::Monitoring => "monitoring",
            CallState::Completed => "completed",
            CallState::Aborted(_) => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Completed | CallState::Aborted(_))
    }

    pub fn can_transition_to(&self, next: &CallState) -> bool {
        matches!(
            (self, next),
            (CallState::Pending, CallState::Verified)
                | (CallState::Verified, CallState::Routed)
                | (CallState::Routed, CallState::Monitoring)
                | (CallState::Monitoring, CallState::Completed)
        ) || (!self.is_terminal() && matches!(next, CallState::Aborted(_)))
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
