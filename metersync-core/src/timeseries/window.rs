use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;

use super::util::{latest_complete_hour, local_midnight, truncate_to_hour};
use crate::types::{MAX_LOOKBACK_DAYS, SyncConfig, SyncWindow};

/// Plan the next window to request.
///
/// - Without a watermark the window starts at local midnight of
///   `now - min(lookback_days, MAX_LOOKBACK_DAYS)` days.
/// - With a watermark it starts one hour after the watermark.
/// - `end` is the most recent complete hour, pulled in so that the span never
///   exceeds `MAX_LOOKBACK_DAYS`.
///
/// A window with `start >= end` is empty; callers skip the fetch.
#[must_use]
pub fn plan(watermark: Option<DateTime<Utc>>, config: &SyncConfig, now: DateTime<Utc>) -> SyncWindow {
    let tz = config.timezone;
    let frontier = latest_complete_hour(now, tz);
    let start = match watermark {
        Some(w) => truncate_to_hour(w, tz) + TimeDelta::hours(1),
        None => {
            let back = TimeDelta::days(i64::from(config.effective_lookback_days()));
            local_midnight(now - back, tz)
        }
    };
    let cap = TimeDelta::days(i64::from(MAX_LOOKBACK_DAYS));
    SyncWindow::new(start, frontier.min(start + cap))
}

/// True when `window` leaves nothing behind the most recent complete hour,
/// either because it is empty or because its end reached that hour.
#[must_use]
pub fn reaches_frontier(window: &SyncWindow, now: DateTime<Utc>, tz: Tz) -> bool {
    window.is_empty() || window.end >= latest_complete_hour(now, tz)
}
