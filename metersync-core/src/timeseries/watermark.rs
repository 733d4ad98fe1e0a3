use chrono::{DateTime, Utc};

use crate::types::{Reading, SyncWindow};

/// Advance the watermark over `readings`.
///
/// Returns the max of `current` and every reading timestamp, plus whether it
/// moved. An absent watermark orders before every timestamp.
#[must_use]
pub fn advance(
    current: Option<DateTime<Utc>>,
    readings: &[Reading],
) -> (Option<DateTime<Utc>>, bool) {
    let next = readings.iter().map(|r| r.timestamp).fold(current, |acc, ts| {
        Some(acc.map_or(ts, |a| a.max(ts)))
    });
    (next, next != current)
}

/// Advance the watermark to the end of a window the upstream answered with
/// `"OK"` and no records. Never moves backwards; an empty window is a no-op.
#[must_use]
pub fn advance_to_window_end(
    current: Option<DateTime<Utc>>,
    window: &SyncWindow,
) -> (Option<DateTime<Utc>>, bool) {
    if window.is_empty() {
        return (current, false);
    }
    let next = Some(current.map_or(window.end, |c| c.max(window.end)));
    (next, next != current)
}
