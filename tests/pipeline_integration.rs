//! Integration tests for the full call decision pipeline

mod common;

use callroute::anomaly::{CALL_VOLUME, FAILURE_RATE};
use callroute::collaborator::EventKind;
use callroute::config::EngineConfig;
use callroute::orchestrator::{AbortReason, CallDecision, CallState};
use callroute::routing::{Route, SelectionStrategy};
use common::*;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_call_lifecycle_end_to_end() {
    let engine = make_engine();
    let orchestrator = &engine.orchestrator;

    let decision = orchestrator
        .process_call(make_request("call-1"), &all_trunks(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(decision.call_id(), "call-1");
    assert_eq!(decision.route().map(Route::id), Some(TRUNK_CHEAP));
    assert_eq!(orchestrator.live_calls(), vec!["call-1"]);

    let completed = orchestrator.complete_call("call-1").await.unwrap();
    assert_eq!(completed.route.as_ref().map(Route::id), Some(TRUNK_CHEAP));
    assert!(orchestrator.session("call-1").is_none());

    assert_eq!(
        engine.sink.events_for("call-1"),
        vec![
            EventKind::CallStarted,
            EventKind::CallVerified,
            EventKind::RouteSelected,
            EventKind::RiskAssessed,
            EventKind::CallCompleted,
        ]
    );
}

#[tokio::test]
async fn test_decision_serializes_with_outcome_tag() {
    let engine = make_engine();
    let decision = engine
        .orchestrator
        .process_call(make_request("call-1"), &all_trunks(), CancellationToken::new())
        .await
        .unwrap();

    let json = serde_json::to_value(&decision).unwrap();
    assert_eq!(json["outcome"], "proceed");
    assert_eq!(json["route"], TRUNK_CHEAP);
    assert_eq!(json["strategy"], "least_cost");
    assert_eq!(json["risk"]["level"], "low");
}

#[tokio::test]
async fn test_every_abort_carries_a_reason_code() {
    let engine = make_engine_with(
        &EngineConfig::default(),
        Arc::new(make_provider()),
        Arc::new(ListAuthenticator::blocking(&[CALLER])),
    );

    let decision = engine
        .orchestrator
        .process_call(make_request("call-1"), &all_trunks(), CancellationToken::new())
        .await
        .unwrap();

    let json = serde_json::to_value(&decision).unwrap();
    assert_eq!(json["outcome"], "aborted");
    assert_eq!(json["reason"]["code"], "verification_failed");
    assert_eq!(json["reason"]["error_code"], "CALLER_BLOCKED");
}

#[tokio::test]
async fn test_probe_outage_aborts_with_metric_unavailable() {
    let provider = PartialOutageProvider::new(make_provider(), &[TRUNK_SLOW]);
    let engine = make_engine_with(
        &EngineConfig::default(),
        Arc::new(provider),
        Arc::new(ListAuthenticator::allow_all()),
    );

    let decision = engine
        .orchestrator
        .process_call(make_request("call-1"), &all_trunks(), CancellationToken::new())
        .await
        .unwrap();

    match decision.abort_reason() {
        Some(AbortReason::MetricUnavailable { route, .. }) => assert_eq!(route.id(), TRUNK_SLOW),
        other => panic!("expected metric_unavailable, got {:?}", other),
    }
    assert!(engine.orchestrator.live_calls().is_empty());
}

#[tokio::test]
async fn test_config_file_selects_strategy() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[orchestrator]
strategy = "score_first"
top_k = 2
"#
    )
    .unwrap();

    let config = EngineConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.orchestrator.strategy, SelectionStrategy::ScoreFirst);

    let engine = make_engine_with(
        &config,
        Arc::new(make_provider()),
        Arc::new(ListAuthenticator::allow_all()),
    );
    let decision = engine
        .orchestrator
        .process_call(make_request("call-1"), &all_trunks(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(decision.route().map(Route::id), Some(TRUNK_FAST));
}

#[tokio::test]
async fn test_parent_token_cancels_in_flight_call() {
    let engine = make_engine_with(
        &EngineConfig::default(),
        Arc::new(make_provider()),
        Arc::new(ListAuthenticator::allow_all().with_delay(Duration::from_secs(5))),
    );
    let parent = CancellationToken::new();

    let call = {
        let orchestrator = engine.orchestrator.clone();
        let token = parent.clone();
        tokio::spawn(async move {
            orchestrator
                .process_call(make_request("call-1"), &all_trunks(), token)
                .await
        })
    };

    while !engine.orchestrator.sessions().contains("call-1") {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    parent.cancel();

    let decision = call.await.unwrap().unwrap();
    assert_eq!(decision.abort_reason(), Some(&AbortReason::Cancelled));
    assert!(engine.orchestrator.live_calls().is_empty());
    assert_eq!(
        engine.sink.events_for("call-1").last(),
        Some(&EventKind::CallAborted)
    );
}

#[tokio::test]
async fn test_statistics_feed_baseline_refresh() {
    let engine = make_engine();
    let orchestrator = &engine.orchestrator;

    for i in 0..4 {
        let id = format!("warmup-{}", i);
        orchestrator
            .process_call(make_request(&id), &all_trunks(), CancellationToken::new())
            .await
            .unwrap();
        orchestrator.complete_call(&id).await.unwrap();
    }

    // Host closes the window; earlier windows ran at twice the volume
    let window = orchestrator.statistics().reset_window();
    assert_eq!(window.started, 4);
    assert_eq!(window.completed, 4);
    engine.baselines.update(CALL_VOLUME, &[6.0, 10.0]).unwrap();
    engine.baselines.update(FAILURE_RATE, &[0.0, 0.0]).unwrap();

    // Gated on the closed window: volume 4 against a mean of 8 is a 0.5
    // deviation, and a zero failure-rate mean cannot be compared
    let decision = orchestrator
        .process_call(make_request("call-1"), &all_trunks(), CancellationToken::new())
        .await
        .unwrap();
    match decision {
        CallDecision::Proceed(decision) => {
            assert_eq!(decision.risk.anomaly_count, 1);
            assert!((decision.risk.score - 0.15).abs() < 1e-9);
            assert_eq!(decision.degenerate_metrics, vec![FAILURE_RATE.to_string()]);
        }
        other => panic!("expected proceed, got {:?}", other),
    }
    let session = orchestrator.session("call-1").unwrap();
    assert_eq!(session.state, CallState::Monitoring);
    assert_eq!(session.system_window, Some(window));
}
