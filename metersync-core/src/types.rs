//! Re-export of the shared types from `metersync-types`.
// Consolidated re-exports so downstream crates can depend on `metersync-core` only

pub use metersync_types::{
    ACCESS_DENIED, AccessToken, AuthError, CATCH_UP_POLL_INTERVAL, Credentials, CycleOutcome,
    CycleReport, FetchFailure, FetchFailureKind, MAX_LOOKBACK_DAYS, MEASUREMENT_ACTIVE_ENERGY,
    MeterId, PeriodValues, PersistedState, PollConfig, PollPhase, RESOLUTION_HOUR, RawRecord,
    Reading, STATUS_OK, STEADY_POLL_INTERVAL, StatisticMetadata, StatisticPoint, SyncConfig,
    SyncError, SyncStatus, SyncWindow, WatermarkPolicy,
};

pub use chrono::{DateTime, TimeDelta, Utc};
pub use chrono_tz::Tz;
