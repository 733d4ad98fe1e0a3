//! Reports and status snapshots surfaced to the host.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PollConfig;
use crate::error::SyncError;
use crate::meter::MeterId;
use crate::series::SyncWindow;

/// Polling phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PollPhase {
    /// The watermark lags behind the most recent complete hour.
    #[default]
    CatchingUp,
    /// The watermark reached the most recent complete hour.
    Steady,
}

impl PollPhase {
    /// Base delay until the next cycle in this phase.
    #[must_use]
    pub const fn interval(self, cfg: &PollConfig) -> Duration {
        match self {
            Self::CatchingUp => cfg.catch_up_interval,
            Self::Steady => cfg.steady_interval,
        }
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum CycleOutcome {
    /// New readings were accepted and published.
    Synced {
        /// Number of readings accepted.
        readings: usize,
        /// Cumulative sum of the last published point.
        last_sum: f64,
    },
    /// The fetch succeeded but produced no new readings.
    NoNewData,
    /// The planner produced an empty window; nothing was fetched.
    UpToDate,
    /// The cycle failed; the watermark is unchanged.
    Failed(SyncError),
}

impl CycleOutcome {
    /// Returns true unless the cycle failed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// Summary of a single sync cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Meter the cycle ran for.
    pub meter_id: MeterId,
    /// Window the planner produced.
    pub window: SyncWindow,
    /// Watermark before the cycle.
    pub watermark_before: Option<DateTime<Utc>>,
    /// Watermark after the cycle; equals `watermark_before` on failure.
    pub watermark_after: Option<DateTime<Utc>>,
    /// Whether the cycle had to reauthenticate.
    pub reauthenticated: bool,
    /// Records dropped because they could not be parsed.
    pub dropped: Vec<SyncError>,
    /// Phase the scheduler should use next.
    pub phase: PollPhase,
    /// Final outcome.
    pub outcome: CycleOutcome,
}

/// Host-visible snapshot of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Meter id.
    pub meter_id: MeterId,
    /// Human-readable label.
    pub alias: String,
    /// Configured lookback in days.
    pub days_back: u32,
    /// Current watermark.
    pub last_update: Option<DateTime<Utc>>,
    /// Current poll phase.
    pub phase: PollPhase,
    /// When the background poller will run next, if one is running.
    pub next_poll: Option<DateTime<Utc>>,
}
