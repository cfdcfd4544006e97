use chrono::{DateTime, NaiveDate, TimeZone};
use now::DateTimeNow;

/// Day logs are named after the local date they cover, e.g. `20250315.log`.
pub fn date_to_log_name(date: NaiveDate) -> String {
    format!("{}.log", date.format("%Y%m%d"))
}

/// Epoch milliseconds of midnight on the day containing `moment`, in the moment's timezone.
pub fn day_start_ms<Tz: TimeZone>(moment: &DateTime<Tz>) -> i64 {
    moment.beginning_of_day().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveDate, TimeZone};

    use super::{date_to_log_name, day_start_ms};

    #[test]
    fn log_names_use_compact_dates() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        assert_eq!(date_to_log_name(date), "20250305.log");
    }

    #[test]
    fn day_start_respects_offset() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let moment = tz.with_ymd_and_hms(2025, 3, 5, 1, 30, 0).unwrap();
        let midnight = tz.with_ymd_and_hms(2025, 3, 5, 0, 0, 0).unwrap();
        assert_eq!(day_start_ms(&moment), midnight.timestamp_millis());
    }
}
