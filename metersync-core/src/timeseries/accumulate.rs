use crate::types::{Reading, StatisticPoint};

/// Fold ascending readings into cumulative statistic points.
///
/// Each point carries the reading as both `value` and `mean`; `sum` continues
/// from `latest_sum` (zero when the series has no stored points yet).
/// Callers must pass normalized (strictly ascending, deduplicated) readings.
#[must_use]
pub fn accumulate(readings: &[Reading], latest_sum: Option<f64>) -> Vec<StatisticPoint> {
    let mut sum = latest_sum.unwrap_or(0.0);
    readings
        .iter()
        .map(|r| {
            sum += r.value;
            StatisticPoint {
                start: r.timestamp,
                value: r.value,
                mean: r.value,
                sum,
            }
        })
        .collect()
}
