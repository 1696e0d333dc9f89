use chrono::{DateTime, Local, Utc};

/// Milliseconds since the Unix epoch, the timestamp unit of every record
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Local wall-clock time of a millisecond timestamp, e.g. `14:03:59`
pub fn local_clock(timestamp_ms: i64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms)
        .map(|utc| utc.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn test_local_clock_follows_local_timezone() {
        let wall = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_milli_opt(13, 5, 9, 250)
            .unwrap();
        let ts = Local.from_local_datetime(&wall).single().unwrap().timestamp_millis();
        assert_eq!(local_clock(ts), "13:05:09");
    }

    #[test]
    fn test_out_of_range_timestamp() {
        assert_eq!(local_clock(i64::MAX), "--:--:--");
    }
}
