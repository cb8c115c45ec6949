//! Calendar helpers for epoch-millisecond timestamps.

use chrono::{DateTime, Utc};

/// Milliseconds in one hour.
pub const MILLIS_PER_HOUR: i64 = 60 * 60 * 1000;

/// Returns the current time as epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn to_utc(timestamp: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(timestamp).unwrap_or_default()
}

/// Returns the UTC calendar date of `timestamp` as `YYYY-MM-DD`.
///
/// Timestamps outside chrono's range map to the epoch date.
pub fn date_of(timestamp: i64) -> String {
    to_utc(timestamp).format("%Y-%m-%d").to_string()
}

/// Returns the UTC wall-clock time of `timestamp` as 24-hour `HH:MM`.
pub fn format_time(timestamp: i64) -> String {
    to_utc(timestamp).format("%H:%M").to_string()
}
