//! metersync-core
//!
//! Collaborator contracts and pure time-series logic shared by the metersync
//! orchestrator and connector implementations.
//!
//! - `types`: re-exports of the shared data types and errors.
//! - `connector`: the `MeterConnector` trait and its capability traits.
//! - `store`: the `SessionStore` persistence contract.
//! - `period`: upstream period specifiers built from sync windows.
//! - `timeseries`: window planning, record normalization, watermark tracking
//!   and statistic accumulation.
//!
//! Everything under `timeseries` is synchronous and deterministic: the current
//! time and the time zone are always passed in explicitly.
#![warn(missing_docs)]

/// Connector capability traits and the primary `MeterConnector` interface.
pub mod connector;
/// Upstream period specifiers.
pub mod period;
/// Persistence contract for session state and statistics.
pub mod store;
/// Pure time-series logic.
pub mod timeseries;
/// Shared data types and errors.
pub mod types;

pub use connector::{Authenticator, MeterConnector, PeriodRequest, PeriodValuesProvider};
pub use period::PeriodSpec;
pub use store::{CycleCommit, SessionStore};
pub use timeseries::accumulate::accumulate;
pub use timeseries::normalize::{Normalized, normalize, normalize_records, parse_record};
pub use timeseries::util::{latest_complete_hour, local_midnight, truncate_to_hour};
pub use timeseries::watermark::{advance, advance_to_window_end};
pub use timeseries::window::{plan, reaches_frontier};
pub use types::*;
