use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::datetime;

/// A calendar date as stored on a task.
///
/// Dates arriving from storage that cannot be parsed are kept verbatim in
/// `Unparsed` so that comparisons can fall back to exact string equality
/// instead of failing.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalendarDate {
    Day(NaiveDate),
    Unparsed(String),
}

impl CalendarDate {
    /// Parse a `YYYY/MM/DD` string, keeping the raw text on failure.
    pub fn parse(raw: &str) -> Self {
        match datetime::parse_date(raw) {
            Ok(date) => Self::Day(date),
            Err(_) => Self::Unparsed(raw.to_string()),
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Day(date) => Some(*date),
            Self::Unparsed(_) => None,
        }
    }

    /// Exact textual comparison against a storage-formatted string.
    pub fn matches_str(&self, other: &str) -> bool {
        match self {
            Self::Day(date) => datetime::format_ymd(*date) == other,
            Self::Unparsed(raw) => raw == other,
        }
    }

    /// Whether this date is `date`, falling back to string equality.
    pub fn is(&self, date: NaiveDate) -> bool {
        match self {
            Self::Day(d) => *d == date,
            Self::Unparsed(raw) => *raw == datetime::format_ymd(date),
        }
    }
}

impl From<NaiveDate> for CalendarDate {
    fn from(date: NaiveDate) -> Self {
        Self::Day(date)
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day(date) => f.write_str(&datetime::format_ymd(*date)),
            Self::Unparsed(raw) => f.write_str(raw),
        }
    }
}

/// A time of day as stored on a task.
///
/// Like [`CalendarDate`], text that is not a valid `HH:MM` is kept verbatim
/// so it is written back unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClockTime {
    At(NaiveTime),
    Unparsed(String),
}

impl ClockTime {
    pub fn parse(raw: &str) -> Self {
        match datetime::parse_time(raw) {
            Ok(time) => Self::At(time),
            Err(_) => Self::Unparsed(raw.to_string()),
        }
    }

    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            Self::At(time) => Some(*time),
            Self::Unparsed(_) => None,
        }
    }

    /// Whether this time lies in an earlier minute than `now`.
    ///
    /// Unparsed times are never overdue.
    pub fn is_before(&self, now: NaiveTime) -> bool {
        match self {
            Self::At(time) => (time.hour(), time.minute()) < (now.hour(), now.minute()),
            Self::Unparsed(_) => false,
        }
    }
}

impl From<NaiveTime> for ClockTime {
    fn from(time: NaiveTime) -> Self {
        Self::At(time)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(time) => f.write_str(&datetime::format_hm(*time)),
            Self::Unparsed(raw) => f.write_str(raw),
        }
    }
}
