//! Metersync keeps a long-term statistic series in step with an hourly
//! energy-metering API.
//!
//! Overview
//! - A [`MeterSync`] session owns one meter's watermark, token and poll phase.
//! - [`MeterSync::run_cycle`] plans the next window from the watermark, fetches
//!   it (reauthenticating once on `"Access denied"`), normalizes the records,
//!   folds them into cumulative points and commits points plus session state
//!   to the [`SessionStore`] in a single call.
//! - [`spawn`] drives a session from a background task, polling every minute
//!   while catching up and every two hours once caught up.
//! - [`MeterRegistry`] owns the pollers of many meters.
//!
//! Key behaviors
//! - The watermark only moves forward and only after the store accepted the
//!   cycle; a failed or cancelled cycle leaves it untouched.
//! - Fetch and authentication failures never end a session; they are reported
//!   in the [`CycleReport`] and retried on the next cycle.
//! - Configuration errors surface from [`MeterSyncBuilder::build`].
//!
//! Examples
//! ```rust,ignore
//! use std::sync::Arc;
//! use metersync::{MeterSync, MeterId, Credentials, SyncConfig};
//!
//! let cfg = SyncConfig::new(MeterId::new("107223")?, Credentials::new("user", "secret"));
//! let sync = MeterSync::builder()
//!     .with_connector(connector)
//!     .with_store(store)
//!     .config(cfg)
//!     .load()
//!     .await?;
//! let handle = metersync::spawn(Arc::new(sync));
//! // ...
//! handle.stop().await;
//! ```
#![warn(missing_docs)]

mod core;
mod registry;
mod session;
mod sync;

pub use core::{MeterSync, MeterSyncBuilder};
pub use registry::MeterRegistry;
pub use session::SessionState;
pub use sync::poller::{SyncHandle, spawn};
pub use sync::scheduler::{PollScheduler, SchedulerAction, SchedulerEvent, next_phase};

pub use metersync_core::connector::{
    Authenticator, MeterConnector, PeriodRequest, PeriodValuesProvider,
};
pub use metersync_core::store::{CycleCommit, SessionStore};
pub use metersync_core::{
    AccessToken, AuthError, Credentials, CycleOutcome, CycleReport, FetchFailure,
    FetchFailureKind, MeterId, PeriodSpec, PeriodValues, PersistedState, PollConfig, PollPhase,
    RawRecord, Reading, StatisticMetadata, StatisticPoint, SyncConfig, SyncError, SyncStatus,
    SyncWindow, WatermarkPolicy,
};
