//! Synchronizer tests on a paused clock.

mod common;

use std::{sync::Arc, time::Duration};

use callops_orchestrator::{
    CallSession, MemoryGateway, PollPhase, PollTarget, SessionConfig, SyncConfig, Synchronizer,
};
use callops_protocol::{CallId, CallRecord, CallSessionRequest, CallStatus};
use chrono::{TimeZone, Utc};
use common::{configuration, init_test_logging, RecordingTransport};
use serde_json::json;
use tokio::time::Instant;

const INTERVAL: Duration = Duration::from_millis(15_000);

fn record(id: &str, status: CallStatus, updated_secs: i64) -> CallRecord {
    CallRecord {
        id: CallId::new(id),
        provider_call_id: Some(format!("retell-{id}")),
        status,
        transcript: None,
        structured_data: None,
        driver_name: "Bilal Ahmed".to_string(),
        load_number: "4556-B".to_string(),
        created_at: Utc.timestamp_opt(1_700_000_000, 0).single(),
        updated_at: Utc.timestamp_opt(1_700_000_000 + updated_secs, 0).single(),
        duration_ms: None,
        agent_config: None,
    }
}

fn setup() -> (Arc<MemoryGateway>, Synchronizer) {
    init_test_logging();
    let gateway = Arc::new(MemoryGateway::new());
    let sync = Synchronizer::new(gateway.clone(), &SyncConfig::default());
    (gateway, sync)
}

#[tokio::test(start_paused = true)]
async fn test_detail_poll_replaces_record_wholesale() {
    let (gateway, sync) = setup();
    gateway.set_record(record("c1", CallStatus::InProgress, 10));

    let handle = sync.watch_call("c1");
    let first = handle.wait_until(|s| s.value.is_some()).await.unwrap();
    let cached = first.value.unwrap();
    assert_eq!(cached.status, CallStatus::InProgress);
    assert!(cached.transcript.is_none());
    let started = Instant::now();

    let mut completed = record("c1", CallStatus::Completed, 90);
    completed.transcript = Some("Agent: Hi Bilal, checking in on load 4556-B.".to_string());
    completed.structured_data = Some(json!({"emergency_detected": false, "eta": "14:30"}));
    completed.duration_ms = Some(65_000);
    gateway.set_record(completed.clone());

    let second = handle
        .wait_until(|s| {
            s.value
                .as_ref()
                .is_some_and(|r| r.status == CallStatus::Completed)
        })
        .await
        .unwrap();

    assert!(started.elapsed() >= INTERVAL);
    assert_eq!(second.value, Some(completed));
    assert_eq!(second.phase, PollPhase::Ready);
    assert!(second.last_error.is_none());
    assert_eq!(gateway.record_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_identical_responses_do_not_notify() {
    let (gateway, sync) = setup();
    gateway.set_records(vec![
        record("c2", CallStatus::Pending, 20),
        record("c1", CallStatus::Completed, 10),
    ]);

    let handle = sync.watch_calls();
    handle.wait_until(|s| s.phase == PollPhase::Ready).await.unwrap();
    let mut rx = handle.subscribe();
    let _ = rx.borrow_and_update();

    tokio::time::sleep(INTERVAL * 3 + Duration::from_millis(1)).await;

    assert!(gateway.list_calls() >= 4);
    assert!(!rx.has_changed().unwrap());
    assert!(sync.metrics().snapshot().polls_unchanged >= 3);
}

#[tokio::test(start_paused = true)]
async fn test_poll_failure_keeps_cache_and_session_state() {
    let (gateway, sync) = setup();
    let transport = RecordingTransport::new();
    let session = CallSession::new(gateway.clone(), transport, &SessionConfig::default());
    session
        .submit(CallSessionRequest::new("cfg-1", "Bilal Ahmed", "4556-B"))
        .await
        .unwrap();
    let ready = session.state();
    assert_eq!(ready.name(), "ready");

    let handle = sync.watch_calls();
    handle.wait_until(|s| s.phase == PollPhase::Ready).await.unwrap();
    let before = handle.value().unwrap();
    assert_eq!(before.len(), 1);

    gateway.set_unavailable(Some("connection refused".to_string()));
    let failed = handle
        .wait_until(|s| s.last_error.is_some())
        .await
        .unwrap();
    assert_eq!(failed.value, Some(before.clone()));
    assert_eq!(failed.phase, PollPhase::Ready);
    assert_eq!(session.state(), ready);
    assert!(!handle.is_stopped());

    // Polling resumes on the next interval once the backend is back.
    gateway.set_unavailable(None);
    let recovered = handle
        .wait_until(|s| s.last_error.is_none())
        .await
        .unwrap();
    assert_eq!(recovered.value, Some(before));
    assert_eq!(session.state(), ready);
}

#[tokio::test(start_paused = true)]
async fn test_detail_initial_failure_is_terminal() {
    let (gateway, sync) = setup();

    let handle = sync.watch_call("missing");
    let snapshot = handle
        .wait_until(|s| matches!(s.phase, PollPhase::Unavailable(_)))
        .await
        .unwrap();
    assert_eq!(snapshot.phase, PollPhase::Unavailable("Call not found".to_string()));
    assert!(snapshot.value.is_none());

    tokio::time::sleep(INTERVAL * 4).await;
    assert_eq!(gateway.record_calls(), 1);
    assert!(handle.is_stopped());
    assert!(sync.active_targets().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_list_initial_failure_shows_empty_list_and_keeps_polling() {
    let (gateway, sync) = setup();
    gateway.set_unavailable(Some("connection refused".to_string()));

    let handle = sync.watch_calls();
    let empty = handle
        .wait_until(|s| s.phase == PollPhase::Ready)
        .await
        .unwrap();
    assert_eq!(empty.value, Some(Vec::new()));
    assert!(empty.last_error.is_some());

    gateway.set_unavailable(None);
    gateway.set_records(vec![record("c1", CallStatus::InProgress, 10)]);
    let loaded = handle
        .wait_until(|s| s.value.as_ref().is_some_and(|v| v.len() == 1))
        .await
        .unwrap();
    assert!(loaded.last_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_refresh_now_skips_wait() {
    let (gateway, sync) = setup();

    let handle = sync.watch_calls();
    handle.wait_until(|s| s.phase == PollPhase::Ready).await.unwrap();
    let started = Instant::now();

    gateway.set_records(vec![record("c1", CallStatus::Pending, 10)]);
    handle.refresh_now();
    handle
        .wait_until(|s| s.value.as_ref().is_some_and(|v| !v.is_empty()))
        .await
        .unwrap();

    assert!(started.elapsed() < INTERVAL);
    assert_eq!(gateway.list_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_polling_is_idempotent() {
    let (gateway, sync) = setup();

    let handle = sync.watch_calls();
    handle.wait_until(|s| s.phase == PollPhase::Ready).await.unwrap();
    handle.stop_polling();
    handle.stop_polling();
    assert!(handle.is_stopped());

    tokio::time::sleep(INTERVAL * 4).await;
    assert_eq!(gateway.list_calls(), 1);
    assert!(sync.active_targets().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_independent_targets() {
    let (gateway, sync) = setup();
    gateway.set_configurations(vec![configuration("cfg-1", None)]);
    let mut emergency = record("c2", CallStatus::Completed, 20);
    emergency.structured_data = Some(json!({"emergency_detected": true}));
    gateway.set_records(vec![emergency, record("c1", CallStatus::InProgress, 10)]);

    let list = sync.watch_calls();
    let detail = sync.watch_call("c1");
    let dashboard = sync.watch_dashboard();
    assert_eq!(
        sync.active_targets(),
        vec![
            PollTarget::CallList,
            PollTarget::CallRecord(CallId::new("c1")),
            PollTarget::Dashboard,
        ]
    );

    let summary = dashboard
        .wait_until(|s| s.phase == PollPhase::Ready)
        .await
        .unwrap()
        .value
        .unwrap();
    assert_eq!(summary.stats.total_calls, 2);
    assert_eq!(summary.stats.active_calls, 1);
    assert_eq!(summary.stats.completed_calls, 1);
    assert_eq!(summary.stats.emergencies, 1);
    assert_eq!(summary.configurations.len(), 1);

    // Stopping one view leaves the others running.
    detail.stop_polling();
    tokio::time::sleep(INTERVAL + Duration::from_millis(1)).await;
    assert!(!list.is_stopped());
    assert_eq!(
        sync.active_targets(),
        vec![PollTarget::CallList, PollTarget::Dashboard]
    );

    sync.shutdown();
    assert!(list.is_stopped());
    assert!(dashboard.is_stopped());
}

#[tokio::test(start_paused = true)]
async fn test_stale_snapshot_does_not_regress_cache() {
    let (gateway, sync) = setup();
    let mut done = record("c1", CallStatus::Completed, 90);
    done.transcript = Some("Agent: Thanks, drive safe.".to_string());
    gateway.set_record(done.clone());

    let handle = sync.watch_call("c1");
    handle.wait_until(|s| s.value.is_some()).await.unwrap();

    // A lagging replica answers with an older in-progress copy.
    gateway.set_record(record("c1", CallStatus::InProgress, 10));
    tokio::time::sleep(INTERVAL + Duration::from_millis(1)).await;

    assert_eq!(gateway.record_calls(), 2);
    assert_eq!(handle.value(), Some(done));
}
