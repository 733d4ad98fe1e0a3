mod helpers;

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use helpers::*;
use metersync::{AuthError, MeterId, MeterRegistry, SyncConfig, SyncError, WatermarkPolicy};
use metersync_mock::MockBehavior;

async fn settle() {
    tokio::time::sleep(Duration::from_secs(1)).await;
}

fn recent() -> metersync::PersistedState {
    persisted(Utc::now() - TimeDelta::days(1))
}

fn config_for(id: &str) -> SyncConfig {
    SyncConfig::new(MeterId::new(id).unwrap(), creds())
}

#[tokio::test(start_paused = true)]
async fn duplicate_meter_is_rejected() {
    let mut registry = MeterRegistry::new();
    registry.insert(harness(Some(recent())).sync).unwrap();

    let err = registry.insert(harness(None).sync).unwrap_err();

    assert!(matches!(err, SyncError::DuplicateMeter { .. }));
    assert_eq!(registry.len(), 1);
    registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn remove_stops_and_logs_out() {
    let mut registry = MeterRegistry::new();
    let h = harness(Some(recent()));
    let ctrl = h.ctrl.clone();
    registry.insert(h.sync).unwrap();
    settle().await;

    assert!(registry.remove(&meter()).await);
    assert!(!registry.remove(&meter()).await);
    assert!(registry.is_empty());
    assert_eq!(ctrl.logouts().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn statuses_are_ordered_by_meter() {
    let mut registry = MeterRegistry::new();
    for id in ["b-200", "a-100"] {
        registry.insert(harness_with(config_for(id), None).sync).unwrap();
    }
    settle().await;

    let ids: Vec<String> = registry
        .statuses()
        .into_iter()
        .map(|s| s.meter_id.to_string())
        .collect();
    assert_eq!(ids, vec!["a-100", "b-200"]);
    assert!(registry.contains(&MeterId::new("a-100").unwrap()));
    registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn manual_cycle_runs_outside_the_cadence() {
    let mut registry = MeterRegistry::new();
    let h = harness(Some(recent()));
    registry.insert(h.sync).unwrap();
    settle().await;

    let report = registry.run_cycle_now(&meter()).await.unwrap();
    assert_eq!(report.outcome, metersync::CycleOutcome::UpToDate);

    let unknown = MeterId::new("999").unwrap();
    let err = registry.run_cycle_now(&unknown).await.unwrap_err();
    assert!(err.is_config());
    registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_logs_out_every_session() {
    let mut registry = MeterRegistry::new();
    let mut controllers = Vec::new();
    for id in ["a-100", "b-200", "c-300"] {
        let h = harness_with(config_for(id), Some(recent()));
        controllers.push(h.ctrl.clone());
        registry.insert(h.sync).unwrap();
    }
    settle().await;

    registry.shutdown().await;

    for ctrl in controllers {
        assert_eq!(ctrl.logouts().await.len(), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn reconfigure_carries_the_watermark() {
    let mut registry = MeterRegistry::new();
    let h = harness(Some(recent()));
    let (ctrl, store) = (h.ctrl.clone(), Arc::clone(&h.store));
    let old = registry.insert(h.sync).unwrap();
    settle().await;
    let watermark = old.session_snapshot().await.watermark;
    assert!(watermark.is_some());

    let mut cfg = config();
    cfg.lookback_days = 10;
    let next = registry
        .reconfigure(&meter(), cfg, WatermarkPolicy::Carry)
        .await
        .unwrap();

    assert!(!Arc::ptr_eq(&old, &next));
    assert_eq!(next.config().lookback_days, 10);
    assert_eq!(next.session_snapshot().await.watermark, watermark);
    let state = store.state(&meter()).await.unwrap();
    assert_eq!(state.last_update, watermark);
    assert_eq!(state.days_back, 10);
    assert_eq!(state.stored_token.unwrap().expose(), "token-1");
    assert_eq!(ctrl.logouts().await.len(), 1);
    assert!(Arc::ptr_eq(&registry.get(&meter()).unwrap(), &next));
    registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn reconfigure_reset_replans_from_lookback() {
    let mut registry = MeterRegistry::new();
    let h = harness(Some(recent()));
    let store = Arc::clone(&h.store);
    registry.insert(h.sync).unwrap();
    settle().await;

    let next = registry
        .reconfigure(&meter(), config(), WatermarkPolicy::Reset)
        .await
        .unwrap();

    let state = store.state(&meter()).await.unwrap();
    assert_eq!(state.last_update, None);
    // The new poller ran its first cycle from the lookback start.
    settle().await;
    let session = next.session_snapshot().await;
    let window = session.last_window.unwrap();
    assert!(window.end - window.start > TimeDelta::days(29));
    registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_reconfigure_keeps_the_old_session() {
    let mut registry = MeterRegistry::new();
    let h = harness(Some(recent()));
    let ctrl = h.ctrl.clone();
    let old = registry.insert(h.sync).unwrap();
    settle().await;
    ctrl.push_authenticate(MockBehavior::Fail(AuthError::rejected("2", "Invalid password")))
        .await;

    let err = registry
        .reconfigure(&meter(), config(), WatermarkPolicy::Carry)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Auth(AuthError::Rejected { .. })));
    assert!(Arc::ptr_eq(&registry.get(&meter()).unwrap(), &old));
    // Polling resumed with a fresh first cycle.
    settle().await;
    assert!(old.status().next_poll.is_some());
    registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn carrying_to_another_meter_is_refused() {
    let mut registry = MeterRegistry::new();
    let old = registry.insert(harness(Some(recent())).sync).unwrap();
    settle().await;

    let err = registry
        .reconfigure(&meter(), config_for("555"), WatermarkPolicy::Carry)
        .await
        .unwrap_err();

    assert!(err.is_config());
    assert!(Arc::ptr_eq(&registry.get(&meter()).unwrap(), &old));
    registry.shutdown().await;
}
