//! Metersync-specific data transfer objects and configuration primitives.
#![warn(missing_docs)]

mod config;
mod connector;
mod error;
mod meter;
mod reports;
mod series;
mod state;

pub use config::{
    CATCH_UP_POLL_INTERVAL, Credentials, MAX_LOOKBACK_DAYS, MEASUREMENT_ACTIVE_ENERGY, PollConfig,
    RESOLUTION_HOUR, STEADY_POLL_INTERVAL, SyncConfig, WatermarkPolicy,
};
pub use connector::{PeriodValues, RawRecord, STATUS_OK};
pub use error::{ACCESS_DENIED, AuthError, FetchFailure, FetchFailureKind, SyncError};
pub use meter::MeterId;
pub use reports::{CycleOutcome, CycleReport, PollPhase, SyncStatus};
pub use series::{Reading, StatisticMetadata, StatisticPoint, SyncWindow};
pub use state::{AccessToken, PersistedState};
