// Shared fixtures for the session tests; each test binary uses a subset.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use metersync::{
    Credentials, MeterId, MeterSync, PeriodValues, PersistedState, RawRecord, SessionStore,
    SyncConfig,
};
use metersync_mock::{DynamicMockConnector, DynamicMockController, MemorySessionStore};

pub const METER: &str = "107223";

/// Construct a UTC `DateTime` at the top of an hour.
pub fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn meter() -> MeterId {
    MeterId::new(METER).unwrap()
}

pub fn creds() -> Credentials {
    Credentials::new("user", "secret")
}

/// UTC config with the default 30 day lookback.
pub fn config() -> SyncConfig {
    SyncConfig::new(meter(), creds())
}

pub fn rec(time: &str, value: &str) -> RawRecord {
    RawRecord::new(time, value)
}

pub fn ok(records: Vec<RawRecord>) -> PeriodValues {
    PeriodValues::ok(records)
}

/// Persisted state with a watermark and a usable token.
pub fn persisted(watermark: DateTime<Utc>) -> PersistedState {
    PersistedState {
        last_update: Some(watermark),
        stored_token: Some(metersync::AccessToken::new("stored")),
        days_back: 30,
    }
}

pub struct Harness {
    pub sync: MeterSync,
    pub ctrl: DynamicMockController,
    pub store: Arc<MemorySessionStore>,
}

/// Session wired to a dynamic mock and an in-memory store.
pub fn harness(state: Option<PersistedState>) -> Harness {
    harness_with(config(), state)
}

pub fn harness_with(cfg: SyncConfig, state: Option<PersistedState>) -> Harness {
    let (connector, ctrl) = DynamicMockConnector::new_with_controller("mock");
    let store = Arc::new(MemorySessionStore::new());
    let mut builder = MeterSync::builder()
        .with_connector(connector)
        .with_store(Arc::clone(&store) as Arc<dyn SessionStore>)
        .config(cfg)
        .catch_up_interval(Duration::from_secs(60))
        .steady_interval(Duration::from_secs(7200))
        .jitter_percent(0);
    if let Some(state) = state {
        builder = builder.persisted_state(state);
    }
    Harness {
        sync: builder.build().unwrap(),
        ctrl,
        store,
    }
}
