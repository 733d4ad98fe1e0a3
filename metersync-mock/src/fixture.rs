use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeDelta};
use tokio::sync::Mutex;

use metersync_core::connector::{Authenticator, MeterConnector, PeriodRequest, PeriodValuesProvider};
use metersync_core::{
    ACCESS_DENIED, AccessToken, AuthError, Credentials, FetchFailure, PeriodSpec, PeriodValues,
    RawRecord,
};

use crate::fixtures::profile;

#[derive(Default)]
struct FixtureState {
    valid_tokens: HashSet<String>,
    issued: usize,
    available_until: Option<NaiveDateTime>,
}

/// Mock connector serving a deterministic hourly consumption profile.
///
/// Every hour of the requested period gets a record, except hours after
/// [`FixtureConnector::set_available_until`]. Tokens are only valid until
/// [`FixtureConnector::expire_tokens`] is called, after which fetches fail with
/// `"Access denied"` until the caller authenticates again.
pub struct FixtureConnector {
    credentials: Credentials,
    state: Mutex<FixtureState>,
}

impl FixtureConnector {
    /// Connector accepting only `credentials`.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            state: Mutex::new(FixtureState::default()),
        }
    }

    /// Pretend the upstream has no data after this local hour.
    pub async fn set_available_until(&self, last_local_hour: NaiveDateTime) {
        self.state.lock().await.available_until = Some(last_local_hour);
    }

    /// Invalidate every token issued so far.
    pub async fn expire_tokens(&self) {
        self.state.lock().await.valid_tokens.clear();
    }

    fn local_hours(spec: &PeriodSpec) -> Vec<NaiveDateTime> {
        let (first, last) = match *spec {
            PeriodSpec::Day(d) => {
                let Some(first) = d.and_hms_opt(0, 0, 0) else {
                    return Vec::new();
                };
                (first, first + TimeDelta::hours(23))
            }
            PeriodSpec::Range { first, last } => (first, last),
        };
        let mut out = Vec::new();
        let mut t = first;
        while t <= last {
            out.push(t);
            t += TimeDelta::hours(1);
        }
        out
    }
}

#[async_trait]
impl MeterConnector for FixtureConnector {
    fn name(&self) -> &'static str {
        "metersync-fixture"
    }

    fn vendor(&self) -> &'static str {
        "Mock"
    }

    fn as_period_values_provider(&self) -> Option<&dyn PeriodValuesProvider> {
        Some(self as &dyn PeriodValuesProvider)
    }

    fn as_authenticator(&self) -> Option<&dyn Authenticator> {
        Some(self as &dyn Authenticator)
    }
}

#[async_trait]
impl PeriodValuesProvider for FixtureConnector {
    async fn period_values(
        &self,
        token: &AccessToken,
        req: &PeriodRequest,
    ) -> Result<PeriodValues, FetchFailure> {
        let available_until = {
            let guard = self.state.lock().await;
            if !guard.valid_tokens.contains(token.expose()) {
                return Err(FetchFailure::classify("1", ACCESS_DENIED));
            }
            guard.available_until
        };
        let records = Self::local_hours(&req.period)
            .into_iter()
            .filter(|h| available_until.is_none_or(|until| *h <= until))
            .map(|h| RawRecord::new(h.format("%Y%m%d%H").to_string(), profile::value_for(h)))
            .collect();
        Ok(PeriodValues::ok(records))
    }
}

#[async_trait]
impl Authenticator for FixtureConnector {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AccessToken, AuthError> {
        if *credentials != self.credentials {
            return Err(AuthError::rejected("2", "Invalid username or password"));
        }
        let mut guard = self.state.lock().await;
        guard.issued += 1;
        let raw = format!("fixture-{}", guard.issued);
        guard.valid_tokens.insert(raw.clone());
        Ok(AccessToken::new(raw))
    }

    async fn logout(&self, token: &AccessToken) -> Result<(), AuthError> {
        self.state.lock().await.valid_tokens.remove(token.expose());
        Ok(())
    }
}
