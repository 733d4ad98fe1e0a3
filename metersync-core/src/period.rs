use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::types::SyncWindow;

/// Upstream period specifier, inclusive at hour granularity.
///
/// Renders as `YYYYMMDD` for a single local day and `YYYYMMDDHH-YYYYMMDDHH`
/// for an hour range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodSpec {
    /// A full local calendar day.
    Day(NaiveDate),
    /// A local hour range, both ends included.
    Range {
        /// First local hour.
        first: NaiveDateTime,
        /// Last local hour.
        last: NaiveDateTime,
    },
}

impl PeriodSpec {
    /// Build the specifier covering `window.start..=window.end` in `tz`.
    ///
    /// Uses the `Day` form when the window runs from local 00:00 to local
    /// 23:00 of the same date.
    #[must_use]
    pub fn from_window(window: &SyncWindow, tz: Tz) -> Self {
        let first = window.start.with_timezone(&tz).naive_local();
        let last = window.end.with_timezone(&tz).naive_local();
        if first.date() == last.date()
            && first.time().hour() == 0
            && last.time().hour() == 23
            && last - first == TimeDelta::hours(23)
        {
            return Self::Day(first.date());
        }
        Self::Range { first, last }
    }
}

impl fmt::Display for PeriodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day(d) => write!(f, "{}", d.format("%Y%m%d")),
            Self::Range { first, last } => {
                write!(f, "{}-{}", first.format("%Y%m%d%H"), last.format("%Y%m%d%H"))
            }
        }
    }
}
