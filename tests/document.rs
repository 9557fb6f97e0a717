use chrono::NaiveDate;
use serde_json::json;
use tasklane::backend::document::{decode_category, decode_task, decode_task_value, encode_task, Document};
use tasklane::model::{CalendarDate, ClockTime, RepeatType, Task};

fn doc(value: serde_json::Value) -> Document {
    value.as_object().cloned().expect("object")
}

#[test]
fn test_encode_uses_document_field_names() {
    let due = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
    let mut task = Task::new("Buy milk")
        .with_id("t1")
        .with_due_date(due)
        .with_due_time(chrono::NaiveTime::from_hms_opt(7, 5, 0).unwrap())
        .with_repeat(RepeatType::Weekly)
        .with_category("groceries")
        .with_last_modified(42);
    task.set_completed(true, due);

    let encoded = encode_task(&task);

    assert!(!encoded.contains_key("id"));
    assert_eq!(encoded["title"], "Buy milk");
    assert_eq!(encoded["dueDate"], "2025/01/05");
    assert_eq!(encoded["dueTime"], "07:05");
    assert_eq!(encoded["isCompleted"], true);
    assert_eq!(encoded["completionDate"], "2025/01/05");
    assert_eq!(encoded["repeatType"], "WEEKLY");
    assert_eq!(encoded["isRepeating"], true);
    assert_eq!(encoded["categoryId"], "groceries");
    assert_eq!(encoded["lastModified"], 42);
    assert!(encoded["subTasks"].is_array());
    assert!(!encoded.contains_key("attachments"));
}

#[test]
fn test_decode_restores_encoded_task() {
    let due = NaiveDate::from_ymd_opt(2025, 2, 28).unwrap();
    let task = Task::new("Stretch")
        .with_id("t2")
        .with_due_date(due)
        .with_repeat(RepeatType::Daily)
        .with_last_modified(1_000);

    let decoded = decode_task("t2", &encode_task(&task));
    assert_eq!(decoded, task);
}

#[test]
fn test_decode_accepts_localized_repeat_labels() {
    let weekly = decode_task("t1", &doc(json!({"title": "Gym", "repeatType": "Hằng tuần"})));
    assert_eq!(weekly.repeat_type, RepeatType::Weekly);

    let lower = decode_task("t2", &doc(json!({"title": "Gym", "repeatType": "monthly"})));
    assert_eq!(lower.repeat_type, RepeatType::Monthly);

    let unknown = decode_task("t3", &doc(json!({"title": "Gym", "repeatType": "Yearly"})));
    assert_eq!(unknown.repeat_type, RepeatType::None);
}

#[test]
fn test_is_repeating_false_overrides_label() {
    let task = decode_task(
        "t1",
        &doc(json!({"title": "Once", "repeatType": "DAILY", "isRepeating": false})),
    );
    assert_eq!(task.repeat_type, RepeatType::None);
    assert!(!task.is_repeating());
}

#[test]
fn test_decode_accepts_numeric_string_timestamps() {
    let task = decode_task(
        "t1",
        &doc(json!({"title": "Old client", "lastModified": "1700000000000", "createdDate": 5})),
    );
    assert_eq!(task.last_modified, 1_700_000_000_000);
    assert_eq!(task.created_at, 5);

    let missing = decode_task("t2", &doc(json!({"title": "No stamp"})));
    assert_eq!(missing.last_modified, 0);
}

#[test]
fn test_completion_date_dropped_when_not_completed() {
    let task = decode_task(
        "t1",
        &doc(json!({"title": "Open", "isCompleted": false, "completionDate": "2025/01/01"})),
    );
    assert!(!task.is_completed);
    assert!(task.completion_date.is_none());

    let done = decode_task(
        "t2",
        &doc(json!({"title": "Done", "isCompleted": true, "completionDate": "2025/01/01"})),
    );
    assert!(done.is_completed);
    assert_eq!(
        done.completion_date,
        Some(CalendarDate::Day(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()))
    );
}

#[test]
fn test_decode_is_fail_soft() {
    let task = decode_task(
        "t1",
        &doc(json!({
            "title": 17,
            "dueDate": "next tuesday",
            "dueTime": "25:99",
            "isImportant": "true",
        })),
    );
    assert_eq!(task.id, "t1");
    assert_eq!(task.title, "");
    assert_eq!(task.due_date, Some(CalendarDate::Unparsed("next tuesday".to_string())));
    assert_eq!(task.due_time, Some(ClockTime::Unparsed("25:99".to_string())));
    assert!(task.is_important);

    assert!(decode_task_value("t2", &json!("just a string")).is_none());
}

#[test]
fn test_malformed_dates_and_times_are_written_back_verbatim() {
    let task = decode_task(
        "t1",
        &doc(json!({
            "title": "Dentist",
            "dueDate": "next tuesday",
            "dueTime": "25:99",
            "isCompleted": true,
            "completionDate": "someday",
        })),
    );
    assert_eq!(task.completion_date, Some(CalendarDate::Unparsed("someday".to_string())));

    let encoded = encode_task(&task);
    assert_eq!(encoded["dueDate"], json!("next tuesday"));
    assert_eq!(encoded["dueTime"], json!("25:99"));
    assert_eq!(encoded["completionDate"], json!("someday"));
    assert_eq!(decode_task("t1", &encoded), task);
}

#[test]
fn test_decode_parses_well_formed_dates() {
    let task = decode_task(
        "t1",
        &doc(json!({"title": "x", "dueDate": "2025/01/05", "dueTime": "07:05", "isCompleted": true, "completionDate": "2025/01/04"})),
    );
    assert_eq!(task.due_date, Some(CalendarDate::Day(NaiveDate::from_ymd_opt(2025, 1, 5).unwrap())));
    assert_eq!(task.due_time, Some(ClockTime::At(chrono::NaiveTime::from_hms_opt(7, 5, 0).unwrap())));
    assert_eq!(task.completion_date, Some(CalendarDate::Day(NaiveDate::from_ymd_opt(2025, 1, 4).unwrap())));
}

#[test]
fn test_decode_category() {
    let category = decode_category("c1", &json!({"name": "Work", "color": "#ff0000", "sortOrder": 3})).unwrap();
    assert_eq!(category.id, "c1");
    assert_eq!(category.name, "Work");
    assert_eq!(category.sort_order, 3);
    assert!(!category.is_default);

    let defaulted = decode_category("c2", &json!({"name": "Misc"})).unwrap();
    assert_eq!(defaulted.color, "#808080");

    assert!(decode_category("c3", &json!(["not", "an", "object"])).is_none());
}
