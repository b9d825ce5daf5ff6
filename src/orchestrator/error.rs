use super::AbortReason;

/// Errors that can occur during orchestrator operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrchestratorError {
    #[error("call already in progress: {0}")]
    DuplicateCall(String),

    #[error("call not found: {0}")]
    SessionNotFound(String),

    #[error("call {call_id}: cannot move from {from} to {to}")]
    InvalidTransition {
        call_id: String,
        from: &'static str,
        to: &'static str,
    },

    /// The step ended the call. The session is gone; `reason` is its final state.
    #[error("call {call_id} aborted: {reason}")]
    Aborted { call_id: String, reason: AbortReason },
}

impl OrchestratorError {
    pub fn abort_reason(&self) -> Option<&AbortReason> {
        match self {
            OrchestratorError::Aborted { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
