//! Conversion between domain types and flat remote documents.
//!
//! Dates cross this boundary as `YYYY/MM/DD` strings and times as `HH:MM`;
//! everywhere else they are structured values. Decoding never fails: missing
//! or mistyped fields fall back to their defaults.

use log::warn;
use serde_json::{json, Map, Value};

use crate::model::{CalendarDate, Category, ClockTime, RepeatType, Task};

pub type Document = Map<String, Value>;

/// Encode a task as a flat document. The id is the document key and is not
/// part of the body.
pub fn encode_task(task: &Task) -> Document {
    let mut doc = Map::new();
    doc.insert("title".into(), json!(task.title));
    doc.insert("description".into(), json!(task.description));
    doc.insert("dueDate".into(), json!(task.due_date.as_ref().map(CalendarDate::to_string)));
    doc.insert("dueTime".into(), json!(task.due_time.as_ref().map(ClockTime::to_string)));
    doc.insert("isCompleted".into(), json!(task.is_completed));
    doc.insert("isImportant".into(), json!(task.is_important));
    doc.insert("categoryId".into(), json!(task.category_id));
    doc.insert("priority".into(), json!(task.priority));
    doc.insert("category".into(), json!(task.category));
    doc.insert("reminderType".into(), json!(task.reminder_type));
    doc.insert("hasReminder".into(), json!(task.has_reminder));
    doc.insert("repeatType".into(), json!(task.repeat_type.as_str()));
    doc.insert("isRepeating".into(), json!(task.is_repeating()));
    doc.insert(
        "completionDate".into(),
        json!(task.completion_date.as_ref().map(CalendarDate::to_string)),
    );
    doc.insert("createdDate".into(), json!(task.created_at));
    doc.insert("lastModified".into(), json!(task.last_modified));
    if let Some(attachments) = &task.attachments {
        doc.insert("attachments".into(), json!(attachments));
    }
    doc.insert("subTasks".into(), Value::Array(task.subtasks.clone()));
    doc
}

/// Decode a task document stored under `id`.
pub fn decode_task(id: &str, doc: &Document) -> Task {
    let is_completed = bool_field(doc, "isCompleted");
    let completion_date = if is_completed {
        let date = str_field(doc, "completionDate").as_deref().map(CalendarDate::parse);
        if date.is_none() {
            warn!("⚠️ Task {} is completed without a completion date", id);
        }
        date
    } else {
        None
    };

    // An explicit `isRepeating: false` wins over a stale repeat label.
    let repeat_type = match doc.get("isRepeating").and_then(Value::as_bool) {
        Some(false) => RepeatType::None,
        _ => str_field(doc, "repeatType")
            .map(|label| RepeatType::from_label(&label))
            .unwrap_or_default(),
    };

    let due_time = str_field(doc, "dueTime").as_deref().map(ClockTime::parse);
    if let Some(ClockTime::Unparsed(raw)) = &due_time {
        warn!("⚠️ Keeping malformed due time {:?} on task {} as text", raw, id);
    }

    Task {
        id: id.to_string(),
        title: str_field(doc, "title").unwrap_or_default(),
        description: str_field(doc, "description"),
        due_date: str_field(doc, "dueDate").as_deref().map(CalendarDate::parse),
        due_time,
        is_completed,
        completion_date,
        repeat_type,
        is_important: bool_field(doc, "isImportant"),
        priority: str_field(doc, "priority"),
        category_id: str_field(doc, "categoryId"),
        category: str_field(doc, "category"),
        reminder_type: str_field(doc, "reminderType"),
        has_reminder: bool_field(doc, "hasReminder"),
        created_at: millis_field(doc, "createdDate"),
        last_modified: millis_field(doc, "lastModified"),
        attachments: str_field(doc, "attachments"),
        subtasks: doc
            .get("subTasks")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
    }
}

/// Decode a task from a raw JSON value, rejecting anything that is not an
/// object.
pub fn decode_task_value(id: &str, value: &Value) -> Option<Task> {
    value.as_object().map(|doc| decode_task(id, doc))
}

pub fn encode_category(category: &Category) -> Document {
    match serde_json::to_value(category) {
        Ok(Value::Object(doc)) => doc,
        _ => Map::new(),
    }
}

pub fn decode_category(id: &str, value: &Value) -> Option<Category> {
    match serde_json::from_value::<Category>(value.clone()) {
        Ok(mut category) => {
            category.id = id.to_string();
            Some(category)
        }
        Err(e) => {
            warn!("⚠️ Skipping malformed category {}: {}", id, e);
            None
        }
    }
}

fn str_field(doc: &Document, key: &str) -> Option<String> {
    match doc.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn bool_field(doc: &Document, key: &str) -> bool {
    match doc.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

// Older clients wrote timestamps as numbers or numeric strings.
fn millis_field(doc: &Document, key: &str) -> i64 {
    match doc.get(key) {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}
