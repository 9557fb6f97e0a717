use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CalendarDate, ClockTime};
use crate::utils::datetime;

/// Errors raised when a task fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("Task title cannot be empty")]
    EmptyTitle,

    #[error("Task not found: {0}")]
    NotFound(String),
}

/// Recurrence rule of a task, anchored on its due date.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepeatType {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl RepeatType {
    /// Storage label written to task documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatType::None => "NONE",
            RepeatType::Daily => "DAILY",
            RepeatType::Weekly => "WEEKLY",
            RepeatType::Monthly => "MONTHLY",
        }
    }

    /// Parse a stored label. Accepts the canonical labels in any case and
    /// the localized labels older clients wrote; anything else is `None`.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Hằng ngày" => RepeatType::Daily,
            "Hằng tuần" => RepeatType::Weekly,
            "Hằng tháng" => RepeatType::Monthly,
            other => match other.to_ascii_uppercase().as_str() {
                "DAILY" => RepeatType::Daily,
                "WEEKLY" => RepeatType::Weekly,
                "MONTHLY" => RepeatType::Monthly,
                _ => RepeatType::None,
            },
        }
    }
}

/// The core task entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<CalendarDate>,
    pub due_time: Option<ClockTime>,
    pub is_completed: bool,
    pub completion_date: Option<CalendarDate>,
    pub repeat_type: RepeatType,
    pub is_important: bool,
    pub priority: Option<String>,
    pub category_id: Option<String>,
    /// Category display name written by older clients
    pub category: Option<String>,
    pub reminder_type: Option<String>,
    pub has_reminder: bool,
    /// Creation time, epoch millis
    pub created_at: i64,
    /// Last local or remote modification, epoch millis
    pub last_modified: i64,
    pub attachments: Option<String>,
    pub subtasks: Vec<serde_json::Value>,
}

impl Task {
    /// Create a new task with a locally generated id.
    pub fn new(title: impl Into<String>) -> Self {
        let now = datetime::now_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description: None,
            due_date: None,
            due_time: None,
            is_completed: false,
            completion_date: None,
            repeat_type: RepeatType::None,
            is_important: false,
            priority: None,
            category_id: None,
            category: None,
            reminder_type: None,
            has_reminder: false,
            created_at: now,
            last_modified: now,
            attachments: None,
            subtasks: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_due_date(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(CalendarDate::Day(date));
        self
    }

    pub fn with_due_time(mut self, time: NaiveTime) -> Self {
        self.due_time = Some(ClockTime::At(time));
        self
    }

    pub fn with_repeat(mut self, repeat_type: RepeatType) -> Self {
        self.repeat_type = repeat_type;
        self
    }

    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn with_last_modified(mut self, millis: i64) -> Self {
        self.last_modified = millis;
        self
    }

    pub fn is_repeating(&self) -> bool {
        self.repeat_type != RepeatType::None
    }

    /// Whether the task has been assigned an id yet.
    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    pub fn validate(&self) -> Result<(), TaskError> {
        if self.title.trim().is_empty() {
            return Err(TaskError::EmptyTitle);
        }
        Ok(())
    }

    /// Single mutation path for completion state.
    ///
    /// Keeps `completion_date.is_some() == is_completed`: completing stamps
    /// `today`, reopening clears the date.
    pub fn set_completed(&mut self, completed: bool, today: NaiveDate) {
        self.is_completed = completed;
        self.completion_date = completed.then_some(CalendarDate::Day(today));
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_modified = datetime::now_millis().max(self.last_modified + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_completed_keeps_date_in_step() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut task = Task::new("Write report");

        task.set_completed(true, today);
        assert!(task.is_completed);
        assert_eq!(task.completion_date, Some(CalendarDate::Day(today)));

        task.set_completed(false, today);
        assert!(!task.is_completed);
        assert_eq!(task.completion_date, None);
    }

    #[test]
    fn test_touch_is_monotonic() {
        let mut task = Task::new("a").with_last_modified(i64::MAX - 10);
        task.touch();
        assert_eq!(task.last_modified, i64::MAX - 9);
    }

    #[test]
    fn test_repeat_labels() {
        assert_eq!(RepeatType::from_label("weekly"), RepeatType::Weekly);
        assert_eq!(RepeatType::from_label("Hằng tháng"), RepeatType::Monthly);
        assert_eq!(RepeatType::from_label("Không lặp lại"), RepeatType::None);
        assert_eq!(RepeatType::from_label("fortnightly"), RepeatType::None);
    }

    #[test]
    fn test_validate_rejects_blank_title() {
        assert_eq!(Task::new("   ").validate(), Err(TaskError::EmptyTitle));
        assert!(Task::new("ok").validate().is_ok());
    }
}
