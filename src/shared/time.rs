use chrono::Local;
use std::time::{SystemTime, UNIX_EPOCH};

pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Local wall-clock time in the `YYYY-MM-DD HH:MM:SS` form used by history entries.
pub fn log_timestamp() -> String {
    Local::now().format(LOG_TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    #[test]
    fn log_timestamp_round_trips_through_its_format() {
        let stamp = log_timestamp();
        assert_eq!(stamp.len(), 19);
        NaiveDateTime::parse_from_str(&stamp, LOG_TIMESTAMP_FORMAT).expect("parse timestamp");
    }
}
