use chrono::{NaiveDateTime, Timelike};

/// Typical household consumption per local hour of day, in kWh.
const HOURLY_KWH: [&str; 24] = [
    "0.412", "0.388", "0.371", "0.365", "0.369", "0.402", "0.655", "1.104", "0.987", "0.743",
    "0.690", "0.702", "0.811", "0.725", "0.684", "0.702", "0.893", "1.356", "1.612", "1.489",
    "1.210", "0.964", "0.713", "0.502",
];

/// Deterministic value for a local hour: the profile value for its hour of
/// day, nudged by the day of month so consecutive days differ.
pub fn value_for(local_hour: NaiveDateTime) -> String {
    let base = HOURLY_KWH[local_hour.hour() as usize];
    let day = chrono::Datelike::day(&local_hour.date());
    format!("{base}{}", day % 10)
}
