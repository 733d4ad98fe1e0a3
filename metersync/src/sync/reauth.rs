use metersync_core::connector::{PeriodRequest, PeriodValuesProvider};
use metersync_core::{AccessToken, AuthError, FetchFailure, PeriodValues, SyncError};

use crate::core::{MeterSync, call_with_timeout};

/// Result of a fetch including any reauthentication it needed.
pub(crate) struct FetchOutcome {
    pub result: Result<PeriodValues, SyncError>,
    /// Token obtained during this fetch, if any. Set even when the fetch
    /// itself failed afterwards.
    pub refreshed: Option<AccessToken>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    Retry,
}

/// Obtains a fresh token exactly once per access-denied failure.
pub(crate) struct ReauthCoordinator<'a> {
    sync: &'a MeterSync,
}

impl<'a> ReauthCoordinator<'a> {
    pub(crate) const fn new(sync: &'a MeterSync) -> Self {
        Self { sync }
    }

    async fn authenticate(&self) -> Result<AccessToken, SyncError> {
        let auth = self.sync.authenticator()?;
        let token = call_with_timeout(
            "authenticate",
            self.sync.cfg.fetch_timeout,
            auth.authenticate(&self.sync.cfg.credentials),
            || AuthError::Timeout,
        )
        .await?;
        Ok(token)
    }

    /// React to a failed fetch.
    ///
    /// Only an access-denied failure triggers an authentication; every other
    /// failure is handed back as `SyncError::Fetch`.
    pub(crate) async fn ensure_authenticated(
        &self,
        failure: &FetchFailure,
    ) -> Result<AccessToken, SyncError> {
        if !failure.is_access_denied() {
            return Err(SyncError::Fetch(failure.clone()));
        }
        #[cfg(feature = "tracing")]
        tracing::info!(meter = %self.sync.cfg.meter_id, "access denied; reauthenticating");
        self.authenticate().await
    }

    async fn call(
        &self,
        provider: &dyn PeriodValuesProvider,
        token: &AccessToken,
        req: &PeriodRequest,
    ) -> Result<PeriodValues, FetchFailure> {
        call_with_timeout(
            "period_values",
            self.sync.cfg.fetch_timeout,
            provider.period_values(token, req),
            || FetchFailure::timeout("period_values"),
        )
        .await
    }

    /// Fetch `req`, retrying once with a fresh token on access denied.
    ///
    /// Without a stored token the session authenticates first; that fresh
    /// token counts as the one reauthentication.
    pub(crate) async fn fetch(
        &self,
        provider: &dyn PeriodValuesProvider,
        stored: Option<AccessToken>,
        req: &PeriodRequest,
    ) -> FetchOutcome {
        let mut refreshed = None;
        let (mut token, mut attempt) = match stored {
            Some(t) => (t, Attempt::First),
            None => match self.authenticate().await {
                Ok(t) => {
                    refreshed = Some(t.clone());
                    (t, Attempt::Retry)
                }
                Err(e) => {
                    return FetchOutcome {
                        result: Err(e),
                        refreshed,
                    };
                }
            },
        };

        loop {
            let failure = match self.call(provider, &token, req).await {
                Ok(values) => {
                    return FetchOutcome {
                        result: Ok(values),
                        refreshed,
                    };
                }
                Err(f) => f,
            };
            let err = match attempt {
                Attempt::First => match self.ensure_authenticated(&failure).await {
                    Ok(fresh) => {
                        token = fresh.clone();
                        refreshed = Some(fresh);
                        attempt = Attempt::Retry;
                        continue;
                    }
                    Err(e) => e,
                },
                Attempt::Retry if failure.is_access_denied() => {
                    SyncError::Auth(AuthError::StillDenied {
                        message: failure.message,
                    })
                }
                Attempt::Retry => SyncError::Fetch(failure),
            };
            return FetchOutcome {
                result: Err(err),
                refreshed,
            };
        }
    }
}
