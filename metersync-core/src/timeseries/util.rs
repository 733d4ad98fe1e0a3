//! Calendar helpers evaluated in an explicit time zone.

use chrono::{DateTime, NaiveDateTime, TimeDelta, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Truncate `t` to the top of its hour as seen in `tz`.
///
/// Works for zones with sub-hour offsets: the minutes are stripped from the
/// local wall clock, not from UTC.
#[must_use]
pub fn truncate_to_hour(t: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let local = t.with_timezone(&tz);
    t - TimeDelta::minutes(i64::from(local.minute()))
        - TimeDelta::seconds(i64::from(local.second()))
        - TimeDelta::nanoseconds(i64::from(local.nanosecond()))
}

/// The most recent complete hour: `now - 1h`, truncated in `tz`.
#[must_use]
pub fn latest_complete_hour(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    truncate_to_hour(now - TimeDelta::hours(1), tz)
}

/// Local midnight of the calendar day containing `t` in `tz`.
///
/// If midnight does not exist on that day (a DST jump at 00:00), the first
/// existing hour of the day is used instead.
#[must_use]
pub fn local_midnight(t: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let date = t.with_timezone(&tz).date_naive();
    (0..3)
        .filter_map(|h| date.and_hms_opt(h, 0, 0))
        .find_map(|naive| localize(naive, tz))
        .unwrap_or_else(|| truncate_to_hour(t, tz))
}

/// Resolve a local wall-clock time in `tz` to an instant.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant; times that
/// do not exist (DST spring-forward gap) yield `None`.
#[must_use]
pub fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}
