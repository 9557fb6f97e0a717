use chrono::NaiveDate;
use tasklane::model::{CalendarDate, RepeatType, Task};
use tasklane::recurrence::{is_active_on, is_active_on_str};
use tasklane::utils::datetime::offset_days;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn task_due(due: NaiveDate, repeat: RepeatType) -> Task {
    Task::new("Recurring").with_id("t1").with_due_date(due).with_repeat(repeat)
}

#[test]
fn test_weekly_scenario() {
    let task = task_due(d(2024, 3, 1), RepeatType::Weekly);

    assert!(is_active_on_str(&task, "2024/03/08"));
    assert!(!is_active_on_str(&task, "2024/03/10"));
    assert!(!is_active_on_str(&task, "2024/02/23"));
}

#[test]
fn test_non_repeating_matches_only_due_date() {
    let due = d(2024, 5, 20);
    let task = task_due(due, RepeatType::None);

    for offset in -40..40 {
        let target = offset_days(due, offset);
        assert_eq!(is_active_on(&task, target), target == due, "offset {}", offset);
    }
}

#[test]
fn test_weekly_matches_whole_weeks_from_due_date() {
    let due = d(2023, 12, 27);
    let task = task_due(due, RepeatType::Weekly);

    for offset in 0..120 {
        let target = offset_days(due, offset);
        assert_eq!(is_active_on(&task, target), offset % 7 == 0, "offset {}", offset);
    }
    assert!(!is_active_on(&task, offset_days(due, -7)));
}

#[test]
fn test_daily_active_from_due_date_onward() {
    let due = d(2024, 2, 28);
    let task = task_due(due, RepeatType::Daily);

    assert!(!is_active_on(&task, offset_days(due, -1)));
    for offset in 0..400 {
        assert!(is_active_on(&task, offset_days(due, offset)));
    }
}

#[test]
fn test_monthly_keeps_day_of_month() {
    let task = task_due(d(2024, 1, 15), RepeatType::Monthly);

    assert!(is_active_on(&task, d(2024, 1, 15)));
    assert!(is_active_on(&task, d(2024, 2, 15)));
    assert!(is_active_on(&task, d(2025, 1, 15)));
    assert!(!is_active_on(&task, d(2024, 2, 14)));
    assert!(!is_active_on(&task, d(2023, 12, 15)));
}

#[test]
fn test_monthly_on_31st_never_matches_short_months() {
    let task = task_due(d(2024, 1, 31), RepeatType::Monthly);

    assert!(!is_active_on(&task, d(2024, 2, 29)));
    assert!(!is_active_on(&task, d(2024, 4, 30)));
    assert!(is_active_on(&task, d(2024, 5, 31)));
}

#[test]
fn test_task_without_due_date_is_never_active() {
    let task = Task::new("Someday").with_repeat(RepeatType::Daily);
    assert!(!is_active_on(&task, d(2024, 3, 1)));
    assert!(!is_active_on_str(&task, "2024/03/01"));
}

#[test]
fn test_malformed_dates_fall_back_to_text_equality() {
    let mut task = Task::new("Legacy");
    task.due_date = Some(CalendarDate::Unparsed("next friday".to_string()));
    task.repeat_type = RepeatType::Weekly;

    // Never panics, only matches the identical text
    assert!(!is_active_on(&task, d(2024, 3, 1)));
    assert!(is_active_on_str(&task, "next friday"));
    assert!(!is_active_on_str(&task, "2024/03/01"));

    // A malformed target against a well-formed due date
    let dated = task_due(d(2024, 3, 1), RepeatType::None);
    assert!(!is_active_on_str(&dated, "garbage"));
}
