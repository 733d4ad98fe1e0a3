//! Time-series value types produced by a sync cycle.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::meter::MeterId;

/// One hourly consumption reading, accepted after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Start of the hour this reading covers.
    pub timestamp: DateTime<Utc>,
    /// Consumption during that hour, in kWh.
    pub value: f64,
}

impl Reading {
    /// Convenience constructor.
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// One point of a long-term statistic series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticPoint {
    /// Start of the hour.
    pub start: DateTime<Utc>,
    /// Hourly value (equal to the reading).
    pub value: f64,
    /// Hourly mean (equal to the reading at hourly resolution).
    pub mean: f64,
    /// Running total including this point.
    pub sum: f64,
}

/// Describes the statistic series a meter's points belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticMetadata {
    /// External statistic id, e.g. `sensor.energiinfo_123`.
    pub statistic_id: String,
    /// Stable unique id, e.g. `123_energy`.
    pub unique_id: String,
    /// Display name.
    pub name: String,
    /// Unit of measurement.
    pub unit: String,
    /// Whether points carry a running sum.
    pub has_sum: bool,
    /// Whether points carry a mean the store should aggregate.
    pub has_mean: bool,
}

impl StatisticMetadata {
    /// Metadata for the energy series of `meter`, labelled with `alias`.
    #[must_use]
    pub fn for_meter(meter: &MeterId, alias: &str) -> Self {
        Self {
            statistic_id: format!("sensor.energiinfo_{meter}"),
            unique_id: format!("{meter}_energy"),
            name: format!("{alias} Energy Usage"),
            unit: "kWh".to_string(),
            has_sum: true,
            has_mean: false,
        }
    }
}

/// An hourly-aligned time window.
///
/// `end` is the most recent hour to request; the upstream request covers
/// `start..=end`. A window with `start >= end` is empty and is never fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncWindow {
    /// First hour to request.
    pub start: DateTime<Utc>,
    /// Last hour to request.
    pub end: DateTime<Utc>,
}

impl SyncWindow {
    /// Build a window.
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// True when there is nothing to fetch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// `end - start`, or zero for an empty window.
    #[must_use]
    pub fn span(&self) -> TimeDelta {
        if self.is_empty() {
            TimeDelta::zero()
        } else {
            self.end - self.start
        }
    }
}
