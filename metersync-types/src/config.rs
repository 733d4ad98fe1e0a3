//! Configuration types shared by the sync engine and its collaborators.

use std::fmt;
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::meter::MeterId;

/// Hard cap on the width of any planned window, in days.
pub const MAX_LOOKBACK_DAYS: u32 = 90;

/// Poll interval while the watermark lags behind the most recent complete hour.
pub const CATCH_UP_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Poll interval once the watermark has reached the most recent complete hour.
pub const STEADY_POLL_INTERVAL: Duration = Duration::from_secs(2 * 60 * 60);

/// Measurement kind requested from the metering API.
pub const MEASUREMENT_ACTIVE_ENERGY: &str = "ActiveEnergy";

/// Resolution requested from the metering API.
pub const RESOLUTION_HOUR: &str = "hour";

/// Username/password pair used to (re)authenticate against the metering API.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account name.
    pub username: String,
    /// Account secret. Redacted from `Debug` output.
    pub password: String,
}

impl Credentials {
    /// Build a credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Per-meter sync configuration. Immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Metering point to synchronize.
    pub meter_id: MeterId,
    /// Human-readable label for the meter.
    pub alias: String,
    /// How far back the first sync reaches, in days. Capped at
    /// [`MAX_LOOKBACK_DAYS`] when planning.
    pub lookback_days: u32,
    /// Credentials used for (re)authentication.
    pub credentials: Credentials,
    /// Zone used for all calendar arithmetic and record parsing.
    pub timezone: Tz,
    /// Timeout applied to every collaborator call.
    pub fetch_timeout: Duration,
}

impl SyncConfig {
    /// Build a configuration with a 30 day lookback, UTC and a 30 second
    /// collaborator timeout.
    pub fn new(meter_id: MeterId, credentials: Credentials) -> Self {
        Self {
            alias: meter_id.as_str().to_string(),
            meter_id,
            lookback_days: 30,
            credentials,
            timezone: Tz::UTC,
            fetch_timeout: Duration::from_secs(30),
        }
    }

    /// Lookback actually used for planning: `min(lookback_days, MAX_LOOKBACK_DAYS)`.
    #[must_use]
    pub fn effective_lookback_days(&self) -> u32 {
        self.lookback_days.min(MAX_LOOKBACK_DAYS)
    }
}

/// Poll cadence settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between cycles while catching up.
    pub catch_up_interval: Duration,
    /// Delay between cycles once caught up.
    pub steady_interval: Duration,
    /// Random jitter percentage [0, 100] applied to each delay.
    pub jitter_percent: u8,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            catch_up_interval: CATCH_UP_POLL_INTERVAL,
            steady_interval: STEADY_POLL_INTERVAL,
            jitter_percent: 0,
        }
    }
}

/// What happens to the watermark when a session is reconfigured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub enum WatermarkPolicy {
    /// Keep the persisted watermark; the new session continues where the old one stopped.
    #[default]
    Carry,
    /// Drop the watermark; the new session re-plans from its lookback.
    Reset,
}
