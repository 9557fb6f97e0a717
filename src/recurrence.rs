//! Recurrence-aware date membership.
//!
//! Decides whether a task is active on a given calendar day, taking its
//! repeat rule into account. Everything here is pure: no clock, no I/O.

use chrono::{Datelike, NaiveDate};

use crate::model::{CalendarDate, RepeatType, Task};
use crate::utils::datetime;

/// Whether `task` occurs on `target`.
///
/// A task without a due date never occurs. A due date that could not be
/// parsed only matches a target with the identical text.
pub fn is_active_on(task: &Task, target: NaiveDate) -> bool {
    match &task.due_date {
        None => false,
        Some(CalendarDate::Day(due)) => occurs_on(*due, task.repeat_type, target),
        Some(CalendarDate::Unparsed(raw)) => *raw == datetime::format_ymd(target),
    }
}

/// Same as [`is_active_on`] for a `YYYY/MM/DD` target string.
///
/// An unparsable target degrades to exact string equality with the stored
/// due date.
pub fn is_active_on_str(task: &Task, target: &str) -> bool {
    match datetime::parse_date(target) {
        Ok(date) => is_active_on(task, date),
        Err(_) => task.due_date.as_ref().is_some_and(|due| due.matches_str(target)),
    }
}

/// Occurrence test on already parsed dates.
pub fn occurs_on(due: NaiveDate, repeat_type: RepeatType, target: NaiveDate) -> bool {
    if target < due {
        return false;
    }

    match repeat_type {
        RepeatType::None => target == due,
        RepeatType::Daily => true,
        RepeatType::Weekly => {
            // Both checks stay: weekday equality and a whole number of weeks.
            target.weekday() == due.weekday() && (target - due).num_days() % 7 == 0
        }
        RepeatType::Monthly => {
            // No end-of-month clamping: the 31st never matches a 30-day month.
            target.day() == due.day() && datetime::month_index(target) - datetime::month_index(due) >= 0
        }
    }
}
