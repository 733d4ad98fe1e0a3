mod helpers;

use helpers::*;
use metersync::{
    AccessToken, AuthError, CycleOutcome, FetchFailure, FetchFailureKind, PersistedState,
    SyncError,
};
use metersync_mock::MockBehavior;

fn denied() -> MockBehavior<metersync::PeriodValues, FetchFailure> {
    MockBehavior::Fail(FetchFailure::access_denied("1"))
}

fn tokens(requests: &[(AccessToken, metersync::PeriodRequest)]) -> Vec<&str> {
    requests.iter().map(|(t, _)| t.expose()).collect()
}

#[tokio::test]
async fn access_denied_retries_the_same_window_once() {
    let h = harness(Some(persisted(utc(2024, 3, 8, 5))));
    h.ctrl.push_period_values(denied()).await;

    let report = h.sync.run_cycle_at(utc(2024, 3, 10, 10)).await.unwrap();

    assert_eq!(report.outcome, CycleOutcome::NoNewData);
    assert!(report.reauthenticated);
    assert_eq!(h.ctrl.authenticate_calls().await, 1);
    let requests = h.ctrl.period_requests().await;
    assert_eq!(tokens(&requests), vec!["stored", "token-1"]);
    assert_eq!(requests[0].1, requests[1].1);

    let state = h.store.state(&meter()).await.unwrap();
    assert_eq!(state.stored_token.as_ref().map(AccessToken::expose), Some("token-1"));
    assert_eq!(state.last_update, Some(utc(2024, 3, 10, 9)));
}

#[tokio::test]
async fn rejected_credentials_end_the_cycle() {
    let h = harness(Some(persisted(utc(2024, 3, 8, 5))));
    h.ctrl.push_period_values(denied()).await;
    h.ctrl
        .push_authenticate(MockBehavior::Fail(AuthError::rejected("2", "Invalid password")))
        .await;

    let report = h.sync.run_cycle_at(utc(2024, 3, 10, 10)).await.unwrap();

    assert!(matches!(
        report.outcome,
        CycleOutcome::Failed(SyncError::Auth(AuthError::Rejected { .. }))
    ));
    assert_eq!(report.watermark_after, Some(utc(2024, 3, 8, 5)));
    assert_eq!(h.ctrl.period_requests().await.len(), 1);
    assert_eq!(h.store.commits().await, 0);
}

#[tokio::test]
async fn denied_again_after_reauth_keeps_the_fresh_token() {
    let h = harness(Some(persisted(utc(2024, 3, 8, 5))));
    h.ctrl.set_period_values(denied()).await;

    let report = h.sync.run_cycle_at(utc(2024, 3, 10, 10)).await.unwrap();

    assert!(matches!(
        report.outcome,
        CycleOutcome::Failed(SyncError::Auth(AuthError::StillDenied { .. }))
    ));
    assert_eq!(h.ctrl.authenticate_calls().await, 1);
    assert_eq!(h.ctrl.period_requests().await.len(), 2);

    let state = h.store.state(&meter()).await.unwrap();
    assert_eq!(state.last_update, Some(utc(2024, 3, 8, 5)));
    assert_eq!(state.stored_token.as_ref().map(AccessToken::expose), Some("token-1"));
    let session = h.sync.session_snapshot().await;
    assert_eq!(session.token.as_ref().map(AccessToken::expose), Some("token-1"));
}

#[tokio::test]
async fn fresh_token_outlives_a_failed_commit() {
    let h = harness(Some(persisted(utc(2024, 3, 8, 5))));
    h.ctrl.push_period_values(denied()).await;
    h.store.set_fail_commits(true).await;
    let now = utc(2024, 3, 10, 10);

    let report = h.sync.run_cycle_at(now).await.unwrap();
    assert!(report.reauthenticated);
    assert!(matches!(report.outcome, CycleOutcome::Failed(SyncError::Store(_))));
    assert_eq!(report.watermark_after, Some(utc(2024, 3, 8, 5)));

    h.store.set_fail_commits(false).await;
    let report = h.sync.run_cycle_at(now).await.unwrap();

    assert!(!report.reauthenticated);
    assert_eq!(report.outcome, CycleOutcome::NoNewData);
    assert_eq!(h.ctrl.authenticate_calls().await, 1);
    let requests = h.ctrl.period_requests().await;
    assert_eq!(tokens(&requests), vec!["stored", "token-1", "token-1"]);
    let state = h.store.state(&meter()).await.unwrap();
    assert_eq!(state.stored_token.as_ref().map(AccessToken::expose), Some("token-1"));
}

#[tokio::test]
async fn other_failures_do_not_reauthenticate() {
    let h = harness(Some(persisted(utc(2024, 3, 8, 5))));
    h.ctrl
        .push_period_values(MockBehavior::Fail(FetchFailure::rate_limited("slow down")))
        .await;
    h.ctrl
        .push_period_values(MockBehavior::Fail(FetchFailure::classify("1", "access denied")))
        .await;
    let now = utc(2024, 3, 10, 10);

    for kind in [FetchFailureKind::RateLimited, FetchFailureKind::Upstream] {
        let report = h.sync.run_cycle_at(now).await.unwrap();
        match report.outcome {
            CycleOutcome::Failed(SyncError::Fetch(f)) => assert_eq!(f.kind, kind),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(!report.reauthenticated);
    }
    assert_eq!(h.ctrl.authenticate_calls().await, 0);
    assert_eq!(h.ctrl.period_requests().await.len(), 2);
}

#[tokio::test]
async fn missing_token_authenticates_before_fetching() {
    let state = PersistedState {
        stored_token: None,
        ..persisted(utc(2024, 3, 8, 5))
    };
    let h = harness(Some(state));
    h.ctrl.set_period_values(denied()).await;

    let report = h.sync.run_cycle_at(utc(2024, 3, 10, 10)).await.unwrap();

    // The fresh token was the one reauthentication of this cycle.
    assert!(matches!(
        report.outcome,
        CycleOutcome::Failed(SyncError::Auth(AuthError::StillDenied { .. }))
    ));
    assert_eq!(h.ctrl.authenticate_calls().await, 1);
    assert_eq!(tokens(&h.ctrl.period_requests().await), vec!["token-1"]);
}

#[tokio::test]
async fn first_sync_without_state_authenticates_once() {
    let h = harness(None);
    h.ctrl
        .push_period_values(MockBehavior::Return(ok(vec![rec("2024031008", "0.5")])))
        .await;

    let report = h.sync.run_cycle_at(utc(2024, 3, 10, 10)).await.unwrap();

    assert!(report.reauthenticated);
    assert_eq!(report.window.start, utc(2024, 2, 9, 0));
    assert_eq!(
        report.outcome,
        CycleOutcome::Synced {
            readings: 1,
            last_sum: 0.5
        }
    );
    assert_eq!(h.ctrl.authenticate_log().await, vec![creds()]);
    let state = h.store.state(&meter()).await.unwrap();
    assert_eq!(state.stored_token.as_ref().map(AccessToken::expose), Some("token-1"));
    assert_eq!(state.last_update, Some(utc(2024, 3, 10, 8)));
}

#[tokio::test(start_paused = true)]
async fn hanging_authentication_times_out() {
    let h = harness(None);
    h.ctrl.push_authenticate(MockBehavior::Hang).await;

    let report = h.sync.run_cycle_at(utc(2024, 3, 10, 10)).await.unwrap();

    assert!(matches!(
        report.outcome,
        CycleOutcome::Failed(SyncError::Auth(AuthError::Timeout))
    ));
    assert!(h.ctrl.period_requests().await.is_empty());
    assert_eq!(report.watermark_after, None);
}

#[tokio::test]
async fn logout_invalidates_the_token_once() {
    let h = harness(Some(persisted(utc(2024, 3, 8, 5))));

    h.sync.logout().await;
    h.sync.logout().await;

    let logouts = h.ctrl.logouts().await;
    assert_eq!(logouts.len(), 1);
    assert_eq!(logouts[0].expose(), "stored");
    assert!(h.sync.session_snapshot().await.token.is_none());
}
