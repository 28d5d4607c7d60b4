use std::time::{SystemTime, UNIX_EPOCH};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

pub fn now() -> i64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs() as i64)
    .unwrap_or(0)
}

/// Human readable distance between two timestamps, e.g. "5 mins" or "1 day".
///
/// Meant to be used as "Last seen: {} ago". Rounds to the nearest unit and
/// never reports less than 1.
pub fn human_time_diff(from: i64, to: i64) -> String {
  let diff = (to - from).abs();

  let (unit_secs, unit) = match diff {
    d if d < MINUTE => (1, "sec"),
    d if d < HOUR => (MINUTE, "min"),
    d if d < DAY => (HOUR, "hour"),
    d if d < WEEK => (DAY, "day"),
    d if d < MONTH => (WEEK, "week"),
    d if d < YEAR => (MONTH, "month"),
    _ => (YEAR, "year"),
  };

  let count = ((diff as f64 / unit_secs as f64).round() as i64).max(1);
  if count == 1 {
    format!("1 {}", unit)
  } else {
    format!("{} {}s", count, unit)
  }
}
