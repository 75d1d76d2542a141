//! Calendar-date helpers for the engine boundary.
//!
//! Dates cross the boundary as `YYYY-MM-DD` strings and are held as
//! [`chrono::NaiveDate`] inside. Because the format is fixed-width, string
//! order and date order agree.

use chrono::{Datelike, Duration, NaiveDate};
use crate::error::{EngineError, Result};

/// Wire format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a strict `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let bytes = s.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shaped {
        return Err(EngineError::InvalidDateFormat(s.to_string()));
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| EngineError::InvalidDateFormat(s.to_string()))
}

/// Format a date in the wire format.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Weekday index with Sunday = 0 through Saturday = 6.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// The `days` calendar dates ending at `end` (inclusive), oldest first.
pub fn trailing_dates(end: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..days as i64)
        .rev()
        .map(|back| end - Duration::days(back))
        .collect()
}

/// First date of the trailing window of `days` days ending at `end`.
pub fn window_start(end: NaiveDate, days: u32) -> NaiveDate {
    end - Duration::days(days.saturating_sub(1) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_date_accepts_iso() {
        assert_eq!(parse_date("2024-03-05").unwrap(), d(2024, 3, 5));
    }

    #[test]
    fn test_parse_date_rejects_malformed() {
        for bad in ["2024-3-5", "2024/03/05", "05-03-2024", "2024-02-30", "", "2024-03-05T10:00"] {
            assert_eq!(
                parse_date(bad),
                Err(EngineError::InvalidDateFormat(bad.to_string())),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_weekday_index_sunday_is_zero() {
        // 2024-03-03 was a Sunday
        assert_eq!(weekday_index(d(2024, 3, 3)), 0);
        assert_eq!(weekday_index(d(2024, 3, 4)), 1);
        assert_eq!(weekday_index(d(2024, 3, 9)), 6);
    }

    #[test]
    fn test_trailing_dates_oldest_first() {
        let dates = trailing_dates(d(2024, 3, 2), 3);
        assert_eq!(dates, vec![d(2024, 2, 29), d(2024, 3, 1), d(2024, 3, 2)]);
        assert_eq!(window_start(d(2024, 3, 2), 3), d(2024, 2, 29));
    }

    #[test]
    fn test_string_order_matches_date_order() {
        let a = d(2023, 12, 31);
        let b = d(2024, 1, 1);
        assert!(format_date(a) < format_date(b));
    }
}
