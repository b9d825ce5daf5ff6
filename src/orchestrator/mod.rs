//! Per-call decision pipeline.
//!
//! The orchestrator drives each call through
//! `Pending -> Verified -> Routed -> Monitoring -> Completed`, consulting the
//! authenticator, the metrics provider and the anomaly/risk components on
//! the way. Any step may end the call as `Aborted` with a reason code. Calls
//! are independent: each owns a session in the shared [`SessionStore`] and
//! only the baselines and call statistics are shared.

mod decision;
mod error;
mod session;
mod state;
mod statistics;


pub use decision::{CallDecision, CompletedCall, RouteDecision, SecureChannel};
pub use error::OrchestratorError;
pub use session::{CallSession, SessionStore};
pub use state::{AbortReason, CallState};
pub use statistics::{system_metrics, CallStatistics, StatisticsSnapshot};

use crate::anomaly::{AnomalyDetector, BaselineTracker, CallMetrics, RiskLevel, RiskScorer};
use crate::collaborator::{
    gather_route_metrics, with_deadline, AnalyticsSink, Authenticator, CallRequest,
    CollaboratorError, EventKind, LifecycleEvent, MetricsProvider, SessionEncryptor,
    TracingAnalyticsSink,
};
use crate::config::{ConfigError, EngineConfig, OrchestratorConfig};
use crate::routing::{
    CostEvaluator, Route, RouteScorer, RouteSelection, RoutingError, SelectionStrategy,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// External services the orchestrator consults
#[derive(Clone)]
pub struct Collaborators {
    pub metrics: Arc<dyn MetricsProvider>,
    pub authenticator: Arc<dyn Authenticator>,
    pub analytics: Arc<dyn AnalyticsSink>,
    pub encryptor: Option<Arc<dyn SessionEncryptor>>,
}

impl Collaborators {
    /// Logs analytics through `tracing` and issues no encrypted sessions
    pub fn new(metrics: Arc<dyn MetricsProvider>, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            metrics,
            authenticator,
            analytics: Arc::new(TracingAnalyticsSink),
            encryptor: None,
        }
    }

    pub fn with_analytics(mut self, analytics: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = analytics;
        self
    }

    pub fn with_encryptor(mut self, encryptor: Arc<dyn SessionEncryptor>) -> Self {
        self.encryptor = Some(encryptor);
        self
    }
}

/// Payload sealed into a [`SecureChannel`]
#[derive(Serialize)]
struct SealedDecision<'a> {
    call_id: &'a str,
    route: &'a Route,
}

/// Composes scoring, costing, anomaly detection and risk scoring into a
/// per-call decision and owns every live call's lifecycle.
pub struct RouteDecisionOrchestrator {
    config: OrchestratorConfig,
    scorer: RouteScorer,
    cost_evaluator: CostEvaluator,
    detector: AnomalyDetector,
    risk_scorer: RiskScorer,
    sessions: Arc<SessionStore>,
    statistics: Arc<CallStatistics>,
    collaborators: Collaborators,
}

impl RouteDecisionOrchestrator {
    /// Build an orchestrator over a shared baseline tracker and session store.
    ///
    /// Every component validates its config slice; the first invalid one is
    /// returned.
    pub fn new(
        config: &EngineConfig,
        baselines: Arc<BaselineTracker>,
        sessions: Arc<SessionStore>,
        collaborators: Collaborators,
    ) -> Result<Self, ConfigError> {
        config.orchestrator.validate()?;
        Ok(Self {
            config: config.orchestrator,
            scorer: RouteScorer::new(config.scoring)?,
            cost_evaluator: CostEvaluator::new(config.cost)?,
            detector: AnomalyDetector::new(baselines, config.anomaly.clone())?,
            risk_scorer: RiskScorer::new(config.risk.clone())?,
            sessions,
            statistics: Arc::new(CallStatistics::new()),
            collaborators,
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn baselines(&self) -> &Arc<BaselineTracker> {
        self.detector.baselines()
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn statistics(&self) -> &Arc<CallStatistics> {
        &self.statistics
    }

    /// Snapshot of a live call
    pub fn session(&self, call_id: &str) -> Option<CallSession> {
        self.sessions.get(call_id)
    }

    /// Ids of calls currently in the pipeline, sorted
    pub fn live_calls(&self) -> Vec<String> {
        self.sessions.live_call_ids()
    }

    /// Deadline for a call starting now
    pub fn deadline_from_now(&self) -> Instant {
        Instant::now() + self.config.deadline()
    }

    /// Run a call through verification, routing and monitoring.
    ///
    /// The pipeline races `cancel` and the configured deadline. Cancellation
    /// aborts the call with `Cancelled`; running past the deadline aborts it
    /// with a collaborator failure. Every abort comes back as
    /// `CallDecision::Aborted` with its reason.
    ///
    /// # Errors
    ///
    /// `OrchestratorError::DuplicateCall` if the call id is already live, in
    /// which case the existing call is untouched.
    pub async fn process_call(
        &self,
        request: CallRequest,
        candidates: &[Route],
        cancel: CancellationToken,
    ) -> Result<CallDecision, OrchestratorError> {
        let deadline = self.deadline_from_now();
        let token = cancel.child_token();
        let session = self.start_session(request, token.clone()).await?;
        let call_id = session.call_id;

        let pipeline = self.run_pipeline(&call_id, candidates, deadline);

        tokio::select! {
            biased;

            _ = token.cancelled() => Ok(self.end_in_flight(&call_id, AbortReason::Cancelled).await),
            outcome = pipeline => match outcome {
                // A host cancel or abort removed the session mid-step
                Err(OrchestratorError::SessionNotFound(_)) if token.is_cancelled() => {
                    Ok(CallDecision::Aborted {
                        call_id: call_id.clone(),
                        reason: AbortReason::Cancelled,
                    })
                }
                other => other,
            },
            _ = tokio::time::sleep_until(deadline) => {
                let reason = AbortReason::collaborator(
                    "orchestrator",
                    format!("decision deadline of {}ms exceeded", self.config.deadline_ms),
                );
                Ok(self.end_in_flight(&call_id, reason).await)
            }
        }
    }

    async fn run_pipeline(
        &self,
        call_id: &str,
        candidates: &[Route],
        deadline: Instant,
    ) -> Result<CallDecision, OrchestratorError> {
        let outcome = async {
            self.verify(call_id, deadline).await?;
            self.route(call_id, candidates, deadline).await?;
            self.monitor(call_id, None).await
        }
        .await;

        match outcome {
            Ok(session) => decision_for(&session, self.config.strategy).map(CallDecision::Proceed),
            Err(OrchestratorError::Aborted { call_id, reason }) => {
                Ok(CallDecision::Aborted { call_id, reason })
            }
            Err(e) => Err(e),
        }
    }

    /// Abort an in-flight call whose pipeline was dropped. The session may
    /// already be gone if `cancel_call` won the race; the outcome is the same.
    async fn end_in_flight(&self, call_id: &str, reason: AbortReason) -> CallDecision {
        if let Err(e) = self.finish_aborted(call_id, reason.clone()).await {
            tracing::debug!(call_id, error = %e, "Call already ended");
        }
        CallDecision::Aborted {
            call_id: call_id.to_string(),
            reason,
        }
    }

    /// Register a new call in `Pending`.
    ///
    /// # Errors
    ///
    /// `OrchestratorError::DuplicateCall` if a live call has the same id.
    pub async fn start_call(&self, request: CallRequest) -> Result<CallSession, OrchestratorError> {
        self.start_session(request, CancellationToken::new()).await
    }

    async fn start_session(
        &self,
        request: CallRequest,
        cancel: CancellationToken,
    ) -> Result<CallSession, OrchestratorError> {
        let mut session = CallSession::new(request, cancel);
        session.system_window = self.statistics.closed_window();
        let session = self.sessions.create(session)?;
        self.statistics.record_started();
        metrics::counter!("callroute_calls_started_total").increment(1);

        tracing::debug!(
            call_id = %session.call_id,
            caller = %session.request.caller,
            callee = %session.request.callee,
            "Call started"
        );
        self.emit(
            &session.call_id,
            EventKind::CallStarted,
            json!({
                "caller": session.request.caller,
                "callee": session.request.callee,
            }),
        )
        .await;

        Ok(session)
    }

    /// `Pending -> Verified`. An unverified caller or a failed
    /// authenticator aborts the call.
    pub async fn verify(
        &self,
        call_id: &str,
        deadline: Instant,
    ) -> Result<CallSession, OrchestratorError> {
        let session = self.live(call_id)?;
        session.check_transition(&CallState::Verified)?;

        let verification =
            with_deadline(deadline, self.collaborators.authenticator.verify(&session.request))
                .await;

        match verification {
            Ok(v) if v.verified => {
                let attestation_level = v.attestation_level.clone();
                let session = self.sessions.advance(call_id, CallState::Verified, |s| {
                    s.attestation_level = v.attestation_level;
                })?;

                tracing::debug!(call_id, attestation = ?attestation_level, "Caller verified");
                self.emit(
                    call_id,
                    EventKind::CallVerified,
                    json!({ "attestation_level": attestation_level }),
                )
                .await;
                Ok(session)
            }
            Ok(v) => Err(self
                .abort_with(
                    call_id,
                    AbortReason::VerificationFailed {
                        error_code: v.error_code,
                    },
                )
                .await),
            Err(e) => Err(self
                .abort_with(call_id, AbortReason::collaborator("authenticator", e.to_string()))
                .await),
        }
    }

    /// `Verified -> Routed`. Scores the candidates, costs the top `top_k`
    /// and picks one with the configured strategy.
    pub async fn route(
        &self,
        call_id: &str,
        candidates: &[Route],
        deadline: Instant,
    ) -> Result<CallSession, OrchestratorError> {
        let session = self.live(call_id)?;
        session.check_transition(&CallState::Routed)?;

        let selection = match self.select_route(candidates, deadline).await {
            Ok(selection) => selection,
            Err(e) => return Err(self.abort_with(call_id, AbortReason::from(e)).await),
        };

        let channel = match self.seal_decision(call_id, &selection.route.route, deadline).await {
            Ok(channel) => channel,
            Err(e) => {
                return Err(self
                    .abort_with(
                        call_id,
                        AbortReason::collaborator("session_encryptor", e.to_string()),
                    )
                    .await)
            }
        };

        let session = self.sessions.advance(call_id, CallState::Routed, |s| {
            s.selection = Some(selection.clone());
            s.secure_channel = channel;
        })?;

        tracing::debug!(
            call_id,
            route = %selection.route.route,
            score = selection.route.score,
            total_cost = selection.cost.total_cost,
            considered = selection.considered,
            strategy = %self.config.strategy,
            "Route selected"
        );
        self.emit(
            call_id,
            EventKind::RouteSelected,
            json!({
                "route": selection.route.route,
                "score": selection.route.score,
                "total_cost": selection.cost.total_cost,
                "considered": selection.considered,
                "strategy": self.config.strategy,
            }),
        )
        .await;

        Ok(session)
    }

    /// Gather metrics, rank, cost the best `top_k` and select.
    async fn select_route(
        &self,
        candidates: &[Route],
        deadline: Instant,
    ) -> Result<RouteSelection, RoutingError> {
        if candidates.is_empty() {
            return Err(RoutingError::NoRoutesAvailable);
        }

        let samples: HashMap<Route, _> =
            gather_route_metrics(self.collaborators.metrics.as_ref(), candidates, deadline)
                .await?
                .into_iter()
                .map(|sample| (sample.route.clone(), sample))
                .collect();

        let ranked = self.scorer.score(candidates, |route: &Route| {
            samples
                .get(route)
                .map(|sample| sample.metrics)
                .ok_or_else(|| RoutingError::MetricUnavailable {
                    route: route.clone(),
                    metric: "latency",
                    reason: "not gathered".to_string(),
                })
        })?;

        let mut costed = Vec::with_capacity(self.config.top_k);
        for weighted in ranked.into_iter().take(self.config.top_k) {
            let components = samples
                .get(&weighted.route)
                .map(|sample| sample.cost_components.as_slice())
                .unwrap_or_default();

            match self.cost_evaluator.evaluate(
                &weighted.route,
                components,
                weighted.metrics.latency_ms,
            ) {
                Ok(cost) => costed.push((weighted, cost)),
                Err(e) if e.is_route_local() => {
                    tracing::warn!(route = %weighted.route, error = %e, "Route excluded from costing");
                    metrics::counter!(
                        "callroute_routes_rejected_total",
                        "reason" => "invalid_cost",
                    )
                    .increment(1);
                }
                Err(e) => return Err(e),
            }
        }

        self.config
            .strategy
            .select(costed)
            .ok_or(RoutingError::NoRoutesAvailable)
    }

    /// Encrypt `{call_id, route}` when an encryptor is configured and enabled
    async fn seal_decision(
        &self,
        call_id: &str,
        route: &Route,
        deadline: Instant,
    ) -> Result<Option<SecureChannel>, CollaboratorError> {
        let encryptor = match &self.collaborators.encryptor {
            Some(encryptor) if self.config.encrypt_decisions => encryptor,
            _ => return Ok(None),
        };

        let session = with_deadline(deadline, encryptor.issue_session()).await?;
        let payload = serde_json::to_vec(&SealedDecision { call_id, route })
            .map_err(|e| CollaboratorError::Configuration(e.to_string()))?;
        let bundle = with_deadline(deadline, encryptor.encrypt(&session, &payload)).await?;

        Ok(Some(SecureChannel {
            session_id: session.id,
            expires_at: session.expires_at,
            ciphertext: bundle.ciphertext,
        }))
    }

    /// `Routed -> Monitoring`. Scans `metrics` for anomalies and aborts the
    /// call if the risk level is high. When `None`, the metrics come from the
    /// statistics window the call entered with plus the route's latency, so
    /// calls running alongside it cannot change the outcome.
    pub async fn monitor(
        &self,
        call_id: &str,
        metrics: Option<CallMetrics>,
    ) -> Result<CallSession, OrchestratorError> {
        let session = self.live(call_id)?;
        session.check_transition(&CallState::Monitoring)?;

        let observed = metrics.unwrap_or_else(|| {
            let latency = session.route_metrics().map(|m| m.latency_ms);
            system_metrics(session.system_window, latency)
        });
        let scan = self.detector.process_call_metrics(&observed);
        let assessment = self.risk_scorer.score(&scan.anomalies);
        let flagged: Vec<&str> = scan.anomalies.iter().map(|a| a.metric_name.as_str()).collect();

        metrics::histogram!("callroute_risk_score").record(assessment.score);
        tracing::debug!(
            call_id,
            score = assessment.score,
            level = %assessment.level,
            anomalies = assessment.anomaly_count,
            degenerate = scan.degenerate.len(),
            "Risk assessed"
        );
        self.emit(
            call_id,
            EventKind::RiskAssessed,
            json!({
                "score": assessment.score,
                "level": assessment.level,
                "anomalies": flagged,
                "degenerate": scan.degenerate,
            }),
        )
        .await;

        if assessment.level == RiskLevel::High {
            return Err(self
                .abort_with(
                    call_id,
                    AbortReason::HighRiskDetected {
                        score: assessment.score,
                    },
                )
                .await);
        }

        let session = self.sessions.advance(call_id, CallState::Monitoring, |s| {
            s.last_risk_assessment = Some(assessment);
            s.degenerate_metrics = scan.degenerate;
        })?;

        metrics::histogram!("callroute_decision_duration_seconds")
            .record(session.elapsed().as_secs_f64());
        Ok(session)
    }

    /// `Monitoring -> Completed`. Removes the session and records its duration.
    pub async fn complete_call(&self, call_id: &str) -> Result<CompletedCall, OrchestratorError> {
        let session = self.sessions.finish(call_id, CallState::Completed)?;
        let duration = session.elapsed();

        self.statistics.record_completed(duration);
        metrics::counter!("callroute_calls_completed_total").increment(1);

        let route = session.selected_route().cloned();
        tracing::info!(
            call_id,
            route = ?route.as_ref().map(Route::id),
            duration_ms = duration.as_millis() as u64,
            "Call completed"
        );
        self.emit(
            call_id,
            EventKind::CallCompleted,
            json!({
                "route": route,
                "duration_ms": duration.as_millis() as u64,
            }),
        )
        .await;

        Ok(CompletedCall {
            call_id: session.call_id.clone(),
            route_metrics: session.route_metrics(),
            route,
            duration,
            last_risk_assessment: session.last_risk_assessment,
            completed_at: Utc::now(),
        })
    }

    /// Abort a live call with `Cancelled` and stop any pipeline running it.
    ///
    /// Decisions already returned for the call stand.
    pub async fn cancel_call(&self, call_id: &str) -> Result<(), OrchestratorError> {
        let session = self.live(call_id)?;
        session.cancellation().cancel();

        match self.finish_aborted(call_id, AbortReason::Cancelled).await {
            Ok(_) => Ok(()),
            // The cancelled pipeline ended the call first
            Err(OrchestratorError::SessionNotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Abort a live call for a host-reported unrecoverable error.
    ///
    /// The call's token is cancelled before the session is removed, so a
    /// `process_call` still running it returns `Aborted` with `Cancelled`.
    /// `reason` is recorded on the returned session and the abort event.
    pub async fn abort_call(
        &self,
        call_id: &str,
        reason: AbortReason,
    ) -> Result<CallSession, OrchestratorError> {
        let session = self.live(call_id)?;
        session.cancellation().cancel();
        self.finish_aborted(call_id, reason).await
    }

    fn live(&self, call_id: &str) -> Result<CallSession, OrchestratorError> {
        self.sessions
            .get(call_id)
            .ok_or_else(|| OrchestratorError::SessionNotFound(call_id.to_string()))
    }

    /// End a call from inside a step and turn the outcome into the step's error
    async fn abort_with(&self, call_id: &str, reason: AbortReason) -> OrchestratorError {
        match self.finish_aborted(call_id, reason.clone()).await {
            Ok(_) => OrchestratorError::Aborted {
                call_id: call_id.to_string(),
                reason,
            },
            Err(e) => e,
        }
    }

    async fn finish_aborted(
        &self,
        call_id: &str,
        reason: AbortReason,
    ) -> Result<CallSession, OrchestratorError> {
        let session = self
            .sessions
            .finish(call_id, CallState::Aborted(reason.clone()))?;

        self.statistics.record_aborted();
        metrics::counter!("callroute_calls_aborted_total", "reason" => reason.code())
            .increment(1);
        metrics::histogram!("callroute_decision_duration_seconds")
            .record(session.elapsed().as_secs_f64());

        tracing::warn!(call_id, reason = reason.code(), detail = %reason, "Call aborted");
        self.emit(
            call_id,
            EventKind::CallAborted,
            json!({ "reason": reason.code(), "detail": reason.to_string() }),
        )
        .await;

        Ok(session)
    }

    /// Best-effort analytics: failures and timeouts are logged and counted
    async fn emit(&self, call_id: &str, kind: EventKind, attributes: serde_json::Value) {
        let event = LifecycleEvent::new(call_id, kind, attributes);
        let outcome = tokio::time::timeout(
            self.config.analytics_timeout(),
            self.collaborators.analytics.log_event(&event),
        )
        .await;

        let error = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {}ms", self.config.analytics_timeout_ms),
        };
        tracing::warn!(call_id, kind = kind.as_str(), error = %error, "Analytics event dropped");
        metrics::counter!("callroute_analytics_failures_total").increment(1);
    }
}

/// Build the host-facing decision from a session that reached `Monitoring`
fn decision_for(
    session: &CallSession,
    strategy: SelectionStrategy,
) -> Result<RouteDecision, OrchestratorError> {
    match (&session.selection, &session.last_risk_assessment) {
        (Some(selection), Some(risk)) => Ok(RouteDecision {
            call_id: session.call_id.clone(),
            route: selection.route.route.clone(),
            score: selection.route.score,
            metrics: selection.route.metrics,
            cost: selection.cost.clone(),
            strategy,
            considered: selection.considered,
            attestation_level: session.attestation_level.clone(),
            risk: risk.clone(),
            degenerate_metrics: session.degenerate_metrics.clone(),
            secure_channel: session.secure_channel.clone(),
        }),
        _ => Err(OrchestratorError::InvalidTransition {
            call_id: session.call_id.clone(),
            from: session.state.name(),
            to: CallState::Monitoring.name(),
        }),
    }
}
