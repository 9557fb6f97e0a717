//! Date and time utility functions
//!
//! Dates cross the storage boundary as `YYYY/MM/DD` strings and times as
//! `HH:MM`. Everything inside the crate works on chrono values; these helpers
//! are the only place the string formats are spelled out.

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveTime, Utc};

/// Date format used for task documents (`YYYY/MM/DD`)
pub const STORAGE_DATE_FORMAT: &str = "%Y/%m/%d";

/// Time-of-day format used for task documents (`HH:MM`)
pub const STORAGE_TIME_FORMAT: &str = "%H:%M";

/// Parse a date string in YYYY/MM/DD format to NaiveDate
///
/// # Arguments
/// * `date_str` - Date string in YYYY/MM/DD format
///
/// # Returns
/// * `Result<NaiveDate, chrono::ParseError>` - Parsed date or parse error
pub fn parse_date(date_str: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(date_str.trim(), STORAGE_DATE_FORMAT)
}

/// Format a NaiveDate to YYYY/MM/DD string
pub fn format_ymd(d: NaiveDate) -> String {
    d.format(STORAGE_DATE_FORMAT).to_string()
}

/// Parse a time string in HH:MM format
pub fn parse_time(time_str: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(time_str.trim(), STORAGE_TIME_FORMAT)
}

/// Format a NaiveTime to HH:MM string
pub fn format_hm(t: NaiveTime) -> String {
    t.format(STORAGE_TIME_FORMAT).to_string()
}

/// Current local calendar date
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Format current local date to YYYY/MM/DD string
pub fn format_today() -> String {
    format_ymd(today())
}

/// Date with an offset in days from `from`
pub fn offset_days(from: NaiveDate, days: i64) -> NaiveDate {
    from + Duration::days(days)
}

/// Current wall clock as epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Month index `year * 12 + month0`, used for month distances
pub fn month_index(d: NaiveDate) -> i32 {
    d.year() * 12 + d.month0() as i32
}
