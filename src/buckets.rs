//! Partitioning of the live task set into overdue / today / future /
//! completed-today buckets, plus the list sort orders.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::model::{CalendarDate, ClockTime, Task};
use crate::utils::datetime;

/// Four disjoint task groups used for list rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskBuckets {
    pub overdue: Vec<Task>,
    pub today: Vec<Task>,
    pub future: Vec<Task>,
    pub completed_today: Vec<Task>,
}

impl TaskBuckets {
    pub fn len(&self) -> usize {
        self.overdue.len() + self.today.len() + self.future.len() + self.completed_today.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sort every bucket in place with the given order.
    pub fn sort(&mut self, order: SortOrder) {
        sort_tasks(&mut self.overdue, order);
        sort_tasks(&mut self.today, order);
        sort_tasks(&mut self.future, order);
        sort_tasks(&mut self.completed_today, order);
    }

    pub fn sorted(mut self, order: SortOrder) -> Self {
        self.sort(order);
        self
    }
}

/// Which bucket an incomplete task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Overdue,
    Today,
    Future,
    CompletedToday,
}

/// Classify one task against `today`.
///
/// Returns `None` for tasks completed on another day: those are not part of
/// any bucket.
pub fn classify(task: &Task, today: NaiveDate) -> Option<Bucket> {
    if task.is_completed {
        return task
            .completion_date
            .as_ref()
            .filter(|date| date.is(today))
            .map(|_| Bucket::CompletedToday);
    }

    let bucket = match task.due_date.as_ref().and_then(CalendarDate::as_date) {
        Some(due) => match due.cmp(&today) {
            Ordering::Less => Bucket::Overdue,
            Ordering::Equal => Bucket::Today,
            Ordering::Greater => Bucket::Future,
        },
        // Missing or unparsable due dates land in today.
        None => Bucket::Today,
    };
    Some(bucket)
}

/// Whether an incomplete task due `today` has a due time in an earlier
/// minute than `now`. Tasks without a parsable due time never qualify.
pub fn is_time_overdue(task: &Task, today: NaiveDate, now: NaiveTime) -> bool {
    !task.is_completed
        && task.due_date.as_ref().is_some_and(|date| date.is(today))
        && task.due_time.as_ref().is_some_and(|time| time.is_before(now))
}

/// Partition `tasks` against `today`. Input order is preserved inside each
/// bucket.
pub fn bucketize<'a, I>(tasks: I, today: NaiveDate) -> TaskBuckets
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut buckets = TaskBuckets::default();
    for task in tasks {
        let target = match classify(task, today) {
            Some(Bucket::Overdue) => &mut buckets.overdue,
            Some(Bucket::Today) => &mut buckets.today,
            Some(Bucket::Future) => &mut buckets.future,
            Some(Bucket::CompletedToday) => &mut buckets.completed_today,
            None => continue,
        };
        target.push(task.clone());
    }
    buckets
}

/// [`bucketize`] against the local calendar date.
pub fn bucketize_now<'a, I>(tasks: I) -> TaskBuckets
where
    I: IntoIterator<Item = &'a Task>,
{
    bucketize(tasks, datetime::today())
}

/// Supported list orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Due date, then due time, ascending; undated tasks last
    #[default]
    DateTime,
    /// Creation time ascending
    CreationTime,
    /// Title, case-insensitive
    Alphabetical,
}

impl SortOrder {
    pub fn value(&self) -> &'static str {
        match self {
            SortOrder::DateTime => "date_time",
            SortOrder::CreationTime => "creation_time",
            SortOrder::Alphabetical => "alphabetical",
        }
    }

    /// Parse a persisted value, defaulting to `DateTime`.
    pub fn from_value(value: &str) -> Self {
        Self::parse(value).unwrap_or_default()
    }

    /// Strict parse, used by config validation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "date_time" => Some(SortOrder::DateTime),
            "creation_time" => Some(SortOrder::CreationTime),
            "alphabetical" => Some(SortOrder::Alphabetical),
            _ => None,
        }
    }
}

/// Stable sort of `tasks`: equal keys keep their input order.
pub fn sort_tasks(tasks: &mut [Task], order: SortOrder) {
    match order {
        SortOrder::DateTime => tasks.sort_by(compare_due),
        SortOrder::CreationTime => tasks.sort_by_key(|t| t.created_at),
        SortOrder::Alphabetical => tasks.sort_by_cached_key(|t| t.title.to_lowercase()),
    }
}

fn compare_due(a: &Task, b: &Task) -> Ordering {
    let date = |t: &Task| t.due_date.as_ref().and_then(CalendarDate::as_date);
    let time = |t: &Task| t.due_time.as_ref().and_then(ClockTime::as_time);
    due_rank(a)
        .cmp(&due_rank(b))
        .then_with(|| date(a).cmp(&date(b)))
        .then_with(|| match (time(a), time(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

// Parsed dates first, then unparsable ones, then undated tasks.
fn due_rank(task: &Task) -> u8 {
    match task.due_date {
        Some(CalendarDate::Day(_)) => 0,
        Some(CalendarDate::Unparsed(_)) => 1,
        None => 2,
    }
}
