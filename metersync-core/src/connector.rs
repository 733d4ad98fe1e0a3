use async_trait::async_trait;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::period::PeriodSpec;
use crate::types::{
    AccessToken, AuthError, Credentials, FetchFailure, MEASUREMENT_ACTIVE_ENERGY, MeterId,
    PeriodValues, RESOLUTION_HOUR, SyncWindow,
};

/// A fully specified period-values request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRequest {
    /// Metering point to query.
    pub meter_id: MeterId,
    /// Period to cover, inclusive at hour granularity.
    pub period: PeriodSpec,
    /// Measurement kind, `"ActiveEnergy"` for consumption.
    pub measurement: String,
    /// Resolution, `"hour"` for hourly values.
    pub resolution: String,
}

impl PeriodRequest {
    /// Hourly active-energy request covering `window` as seen from `tz`.
    #[must_use]
    pub fn hourly_energy(meter_id: MeterId, window: &SyncWindow, tz: Tz) -> Self {
        Self {
            meter_id,
            period: PeriodSpec::from_window(window, tz),
            measurement: MEASUREMENT_ACTIVE_ENERGY.to_string(),
            resolution: RESOLUTION_HOUR.to_string(),
        }
    }
}

/// Focused role trait for connectors that serve historical period values.
#[async_trait]
pub trait PeriodValuesProvider: Send + Sync {
    /// Fetch the raw records for `req` using `token`.
    ///
    /// Upstream `(status, message)` failures are reported through
    /// [`FetchFailure::classify`] so that `"Access denied"` is recognized.
    async fn period_values(
        &self,
        token: &AccessToken,
        req: &PeriodRequest,
    ) -> Result<PeriodValues, FetchFailure>;
}

/// Focused role trait for connectors that issue session tokens.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Exchange credentials for a fresh token.
    async fn authenticate(&self, credentials: &Credentials) -> Result<AccessToken, AuthError>;

    /// Invalidate a token. Default: no-op.
    async fn logout(&self, token: &AccessToken) -> Result<(), AuthError> {
        let _ = token;
        Ok(())
    }
}

/// Main connector trait implemented by metering API clients. Exposes capability discovery.
#[async_trait]
pub trait MeterConnector: Send + Sync {
    /// A stable identifier used in logs and reports.
    fn name(&self) -> &'static str;

    /// Human-friendly vendor string.
    fn vendor(&self) -> &'static str {
        "unknown"
    }

    /// Advertise period-values capability by returning a usable trait object reference.
    fn as_period_values_provider(&self) -> Option<&dyn PeriodValuesProvider> {
        None
    }

    /// Advertise authentication capability by returning a usable trait object reference.
    fn as_authenticator(&self) -> Option<&dyn Authenticator> {
        None
    }
}
