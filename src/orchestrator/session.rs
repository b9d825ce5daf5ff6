//! Live call sessions and the store that owns them

use super::{CallState, OrchestratorError, SecureChannel, StatisticsSnapshot};
use crate::anomaly::RiskAssessment;
use crate::collaborator::CallRequest;
use crate::routing::{Route, RouteMetrics, RouteSelection};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Per-call state owned by the orchestrator from entry to completion or abort
#[derive(Debug, Clone)]
pub struct CallSession {
    pub call_id: String,
    pub request: CallRequest,
    pub state: CallState,
    pub attestation_level: Option<String>,
    pub selection: Option<RouteSelection>,
    pub last_risk_assessment: Option<RiskAssessment>,
    /// Metrics skipped by the last anomaly scan for lack of a usable baseline
    pub degenerate_metrics: Vec<String>,
    pub secure_channel: Option<SecureChannel>,
    /// Closed statistics window the call is risk-gated against, fixed at entry
    pub system_window: Option<StatisticsSnapshot>,
    pub started_at: DateTime<Utc>,
    started: Instant,
    cancel: CancellationToken,
}

impl CallSession {
    pub fn new(request: CallRequest, cancel: CancellationToken) -> Self {
        Self {
            call_id: request.call_id.clone(),
            request,
            state: CallState::Pending,
            attestation_level: None,
            selection: None,
            last_risk_assessment: None,
            degenerate_metrics: Vec::new(),
            secure_channel: None,
            system_window: None,
            started_at: Utc::now(),
            started: Instant::now(),
            cancel,
        }
    }

    pub fn selected_route(&self) -> Option<&Route> {
        self.selection.as_ref().map(|s| &s.route.route)
    }

    pub fn route_metrics(&self) -> Option<RouteMetrics> {
        self.selection.as_ref().map(|s| s.route.metrics)
    }

    /// Time since the call entered the pipeline
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Token cancelled when the call is cancelled
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn check_transition(&self, next: &CallState) -> Result<(), OrchestratorError> {
        if self.state.can_transition_to(next) {
            Ok(())
        } else {
            Err(OrchestratorError::InvalidTransition {
                call_id: self.call_id.clone(),
                from: self.state.name(),
                to: next.name(),
            })
        }
    }
}

/// Shared keyed store of live sessions.
///
/// Mutations for one call id run under that key's shard lock, so they are
/// serialized against each other; different call ids do not wait on one
/// another beyond shard sharing. Terminal sessions are removed, which frees
/// the id for reuse.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, CallSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Register a new session.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::DuplicateCall` if a live session already
    /// uses the same call id.
    pub fn create(&self, session: CallSession) -> Result<CallSession, OrchestratorError> {
        match self.sessions.entry(session.call_id.clone()) {
            Entry::Occupied(entry) => Err(OrchestratorError::DuplicateCall(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(session.clone());
                Ok(session)
            }
        }
    }

    /// Snapshot of a live session
    pub fn get(&self, call_id: &str) -> Option<CallSession> {
        self.sessions.get(call_id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, call_id: &str) -> bool {
        self.sessions.contains_key(call_id)
    }

    /// Move a live session to a non-terminal `next` state after applying
    /// `apply` to it, atomically with respect to other mutations of the call.
    pub fn advance<F>(
        &self,
        call_id: &str,
        next: CallState,
        apply: F,
    ) -> Result<CallSession, OrchestratorError>
    where
        F: FnOnce(&mut CallSession),
    {
        let mut entry = self
            .sessions
            .get_mut(call_id)
            .ok_or_else(|| OrchestratorError::SessionNotFound(call_id.to_string()))?;

        if next.is_terminal() {
            return Err(OrchestratorError::InvalidTransition {
                call_id: call_id.to_string(),
                from: entry.state.name(),
                to: next.name(),
            });
        }
        entry.check_transition(&next)?;

        apply(entry.value_mut());
        entry.state = next;
        Ok(entry.value().clone())
    }

    /// Move a live session to a terminal state and remove it in one step.
    ///
    /// Returns the final snapshot. When two callers race to end the same
    /// call, exactly one succeeds; the other sees `SessionNotFound`.
    pub fn finish(
        &self,
        call_id: &str,
        terminal: CallState,
    ) -> Result<CallSession, OrchestratorError> {
        let removed = self
            .sessions
            .remove_if(call_id, |_, session| {
                terminal.is_terminal() && session.state.can_transition_to(&terminal)
            });

        if let Some((_, mut session)) = removed {
            session.state = terminal;
            return Ok(session);
        }

        let current = self.sessions.get(call_id).map(|entry| entry.state.name());
        Err(match current {
            Some(from) => OrchestratorError::InvalidTransition {
                call_id: call_id.to_string(),
                from,
                to: terminal.name(),
            },
            None => OrchestratorError::SessionNotFound(call_id.to_string()),
        })
    }

    /// Ids of all live calls, sorted
    pub fn live_call_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
