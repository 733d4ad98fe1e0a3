use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use super::util::localize;
use crate::types::{RawRecord, Reading, SyncError};

#[derive(Debug, Error)]
enum RecordError {
    #[error("time must be 10 digits formatted YYYYMMDDHH")]
    TimeFormat,
    #[error("no such calendar hour")]
    NoSuchHour,
    #[error("local hour does not exist in {0}")]
    SkippedHour(Tz),
    #[error("value is not a decimal number")]
    Value,
    #[error("value is not finite")]
    NonFinite,
}

/// Output of [`normalize_records`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    /// Accepted readings, strictly ascending by timestamp.
    pub readings: Vec<Reading>,
    /// One `SyncError::Parse` per dropped record.
    pub rejected: Vec<SyncError>,
}

fn parse_hour_label(label: &str, tz: Tz) -> Result<DateTime<Utc>, RecordError> {
    if label.len() != 10 || !label.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RecordError::TimeFormat);
    }
    let field = |range: std::ops::Range<usize>| -> Result<u32, RecordError> {
        label[range].parse().map_err(|_| RecordError::TimeFormat)
    };
    let year = i32::try_from(field(0..4)?).map_err(|_| RecordError::TimeFormat)?;
    let naive = NaiveDate::from_ymd_opt(year, field(4..6)?, field(6..8)?)
        .and_then(|d| d.and_hms_opt(field(8..10).ok()?, 0, 0))
        .ok_or(RecordError::NoSuchHour)?;
    localize(naive, tz).ok_or(RecordError::SkippedHour(tz))
}

fn parse_value(raw: &str) -> Result<f64, RecordError> {
    let v: f64 = raw.trim().parse().map_err(|_| RecordError::Value)?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(RecordError::NonFinite)
    }
}

/// Parse a single upstream record.
///
/// `time` is a local `YYYYMMDDHH` label in `tz`; an hour that falls into the
/// DST fall-back overlap resolves to its first occurrence.
///
/// # Errors
/// Returns `SyncError::Parse` carrying the raw fields and the reason.
pub fn parse_record(rec: &RawRecord, tz: Tz) -> Result<Reading, SyncError> {
    let to_err = |e: RecordError| SyncError::parse(&rec.time, &rec.value, e.to_string());
    let timestamp = parse_hour_label(&rec.time, tz).map_err(to_err)?;
    let value = parse_value(&rec.value).map_err(to_err)?;
    Ok(Reading::new(timestamp, value))
}

/// Parse, filter and order raw records against the watermark.
///
/// - Unparseable records are dropped and reported in `rejected`.
/// - Only readings strictly after `watermark` are kept.
/// - Output is strictly ascending; a repeated timestamp keeps the value of its
///   last occurrence in `records`.
#[must_use]
pub fn normalize_records(
    records: &[RawRecord],
    watermark: Option<DateTime<Utc>>,
    tz: Tz,
) -> Normalized {
    let mut by_ts: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();
    let mut rejected = Vec::new();
    for rec in records {
        match parse_record(rec, tz) {
            Ok(r) => {
                if watermark.is_none_or(|w| r.timestamp > w) {
                    by_ts.insert(r.timestamp, r.value);
                }
            }
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %e, "dropping unparseable period record");
                rejected.push(e);
            }
        }
    }
    Normalized {
        readings: by_ts
            .into_iter()
            .map(|(ts, v)| Reading::new(ts, v))
            .collect(),
        rejected,
    }
}

/// Like [`normalize_records`], discarding the rejected records.
#[must_use]
pub fn normalize(records: &[RawRecord], watermark: Option<DateTime<Utc>>, tz: Tz) -> Vec<Reading> {
    normalize_records(records, watermark, tz).readings
}
