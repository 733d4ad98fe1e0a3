use chrono::{NaiveDate, TimeZone, Utc};
use metersync_core::connector::{MeterConnector, PeriodRequest};
use metersync_core::store::{CycleCommit, SessionStore};
use metersync_core::{
    AccessToken, Credentials, MeterId, PersistedState, StatisticMetadata, StatisticPoint, SyncWindow, Tz,
};
use metersync_mock::{FixtureConnector, MemorySessionStore};

async fn login(conn: &FixtureConnector, creds: &Credentials) -> AccessToken {
    conn.as_authenticator()
        .expect("authenticator")
        .authenticate(creds)
        .await
        .expect("token")
}

fn meter() -> MeterId {
    MeterId::new("107223").unwrap()
}

#[tokio::test]
async fn fixture_serves_every_hour_of_the_period() {
    let creds = Credentials::new("alice", "pw");
    let conn = FixtureConnector::new(creds.clone());
    let token = login(&conn, &creds).await;
    let w = SyncWindow::new(
        Utc.with_ymd_and_hms(2024, 3, 8, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 3, 8, 23, 0, 0).unwrap(),
    );
    let req = PeriodRequest::hourly_energy(meter(), &w, Tz::UTC);
    assert_eq!(req.period.to_string(), "20240308");
    let pv = conn
        .as_period_values_provider()
        .expect("provider")
        .period_values(&token, &req)
        .await
        .expect("ok");
    assert_eq!(pv.records.len(), 24);
    assert_eq!(pv.records[0].time, "2024030800");
    assert_eq!(pv.records[23].time, "2024030823");
}

#[tokio::test]
async fn fixture_denies_expired_tokens_and_rejects_bad_credentials() {
    let creds = Credentials::new("alice", "pw");
    let conn = FixtureConnector::new(creds.clone());
    let token = login(&conn, &creds).await;
    conn.expire_tokens().await;
    let w = SyncWindow::new(
        Utc.with_ymd_and_hms(2024, 3, 8, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 3, 8, 3, 0, 0).unwrap(),
    );
    let req = PeriodRequest::hourly_energy(meter(), &w, Tz::UTC);
    let err = conn
        .as_period_values_provider()
        .expect("provider")
        .period_values(&token, &req)
        .await
        .expect_err("denied");
    assert!(err.is_access_denied());

    let bad = conn
        .as_authenticator()
        .expect("authenticator")
        .authenticate(&Credentials::new("alice", "wrong"))
        .await;
    assert!(bad.is_err());
}

#[tokio::test]
async fn fixture_respects_availability_horizon() {
    let creds = Credentials::new("alice", "pw");
    let conn = FixtureConnector::new(creds.clone());
    let token = login(&conn, &creds).await;
    conn.set_available_until(
        NaiveDate::from_ymd_opt(2024, 3, 8)
            .unwrap()
            .and_hms_opt(1, 0, 0)
            .unwrap(),
    )
    .await;
    let w = SyncWindow::new(
        Utc.with_ymd_and_hms(2024, 3, 8, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 3, 8, 5, 0, 0).unwrap(),
    );
    let req = PeriodRequest::hourly_energy(meter(), &w, Tz::UTC);
    let pv = conn
        .as_period_values_provider()
        .expect("provider")
        .period_values(&token, &req)
        .await
        .expect("ok");
    assert_eq!(pv.records.len(), 2);
}

#[tokio::test]
async fn memory_store_commits_atomically_and_upserts() {
    let store = MemorySessionStore::new();
    let md = StatisticMetadata::for_meter(&meter(), "Home");
    let t = |h| Utc.with_ymd_and_hms(2024, 3, 8, h, 0, 0).unwrap();
    let point = |h, sum| StatisticPoint {
        start: t(h),
        value: 1.0,
        mean: 1.0,
        sum,
    };

    store.set_fail_commits(true).await;
    let commit = CycleCommit {
        state: PersistedState {
            last_update: Some(t(2)),
            stored_token: None,
            days_back: 30,
        },
        metadata: md.clone(),
        points: vec![point(1, 1.0), point(2, 2.0)],
    };
    assert!(store.commit(&meter(), commit.clone()).await.is_err());
    assert!(store.state(&meter()).await.is_none());
    assert!(store.points(&md.statistic_id).await.is_empty());

    store.set_fail_commits(false).await;
    store.commit(&meter(), commit).await.expect("commit");
    assert_eq!(store.commits().await, 1);
    assert_eq!(store.points(&md.statistic_id).await.len(), 2);
    assert_eq!(store.latest_sum(&md, t(3)).await.unwrap(), Some(2.0));
    assert_eq!(store.latest_sum(&md, t(2)).await.unwrap(), Some(1.0));
    assert_eq!(store.latest_sum(&md, t(1)).await.unwrap(), None);
    assert_eq!(store.metadata(&md.statistic_id).await, Some(md.clone()));

    store.seed_points(&md, vec![point(2, 5.0)]).await;
    assert_eq!(store.points(&md.statistic_id).await[1].sum, 5.0);
    assert_eq!(
        store.load(&meter()).await.unwrap().unwrap().last_update,
        Some(t(2))
    );
}
