use chrono::{NaiveDate, NaiveTime};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tasklane::cache::{CacheEvent, CacheListener, LocalCache, MergePolicy};
use tasklane::model::{Category, RepeatType, Task};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Listener that records a label for every event it sees.
struct Recorder {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl CacheListener for Recorder {
    fn on_event(&self, event: &CacheEvent) {
        let kind = match event {
            CacheEvent::BulkUpdated(tasks) => format!("bulk:{}", tasks.len()),
            CacheEvent::Added(task) => format!("added:{}", task.id),
            CacheEvent::Updated(task) => format!("updated:{}", task.id),
            CacheEvent::Deleted(id) => format!("deleted:{}", id),
        };
        self.log.lock().unwrap().push(format!("{}:{}", self.name, kind));
    }
}

fn recorder(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn CacheListener> {
    Arc::new(Recorder {
        name,
        log: Arc::clone(log),
    })
}

#[test]
fn test_upsert_then_query_returns_task() {
    let cache = LocalCache::new();
    cache.upsert(Task::new("Dentist").with_id("t1").with_due_date(d(2024, 3, 1)));

    let found = cache.query("2024/03/01");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "t1");
    assert!(cache.query("2024/03/02").is_empty());
}

#[test]
fn test_remove_then_query_never_returns_task() {
    let cache = LocalCache::new();
    cache.upsert(
        Task::new("Gym")
            .with_id("t1")
            .with_due_date(d(2024, 3, 1))
            .with_repeat(RepeatType::Daily),
    );
    assert_eq!(cache.query("2024/03/05").len(), 1);

    assert!(cache.remove("t1").is_some());
    for day in 1..=31 {
        assert!(cache.query_date(d(2024, 3, day)).is_empty());
    }

    // Removing again is a no-op
    assert!(cache.remove("t1").is_none());
}

#[test]
fn test_query_before_load_is_empty() {
    let cache = LocalCache::new();
    assert!(!cache.is_loaded());
    assert!(cache.query("2024/03/01").is_empty());
    assert!(cache.all().is_empty());
}

#[test]
fn test_load_replaces_snapshot_and_notifies_full_state() {
    let cache = LocalCache::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    cache.subscribe(recorder("a", &log));

    cache.upsert(Task::new("Old").with_id("old"));
    cache.load(vec![Task::new("One").with_id("1"), Task::new("Two").with_id("2")]);

    assert!(cache.is_loaded());
    assert!(cache.get("old").is_none());
    assert_eq!(cache.len(), 2);
    assert_eq!(*log.lock().unwrap(), vec!["a:added:old", "a:bulk:2"]);
}

#[test]
fn test_upsert_reports_added_then_updated() {
    let cache = LocalCache::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    cache.subscribe(recorder("a", &log));

    assert!(cache.upsert(Task::new("Draft").with_id("t1")));
    assert!(!cache.upsert(Task::new("Final").with_id("t1")));

    assert_eq!(cache.get("t1").unwrap().title, "Final");
    assert_eq!(*log.lock().unwrap(), vec!["a:added:t1", "a:updated:t1"]);
}

#[test]
fn test_listeners_notified_in_registration_order() {
    let cache = LocalCache::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    cache.subscribe(recorder("first", &log));
    cache.subscribe(recorder("second", &log));

    cache.upsert(Task::new("Task").with_id("t1"));
    cache.remove("t1");

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "first:added:t1",
            "second:added:t1",
            "first:deleted:t1",
            "second:deleted:t1"
        ]
    );
}

#[test]
fn test_subscribe_is_idempotent() {
    let cache = LocalCache::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let listener = recorder("a", &log);

    assert!(cache.subscribe(listener.clone()));
    assert!(!cache.subscribe(listener.clone()));
    assert_eq!(cache.listener_count(), 1);

    cache.upsert(Task::new("Task").with_id("t1"));
    assert_eq!(log.lock().unwrap().len(), 1);

    assert!(cache.unsubscribe(&listener));
    assert!(!cache.unsubscribe(&listener));
    cache.upsert(Task::new("Task").with_id("t2"));
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn test_unsubscribe_unknown_listener_is_noop() {
    let cache = LocalCache::new();
    let stranger: Arc<dyn CacheListener> = Arc::new(|_: &CacheEvent| {});
    assert!(!cache.unsubscribe(&stranger));
}

#[test]
fn test_listener_sees_mutation_already_applied() {
    let cache = Arc::new(LocalCache::new());
    let observed = Arc::new(Mutex::new(None));

    let weak = Arc::downgrade(&cache);
    let slot = Arc::clone(&observed);
    cache.subscribe(Arc::new(move |event: &CacheEvent| {
        if let (Some(cache), Some(id)) = (weak.upgrade(), event.task_id()) {
            *slot.lock().unwrap() = Some(cache.contains(id));
        }
    }));

    cache.upsert(Task::new("Visible").with_id("t1"));
    assert_eq!(*observed.lock().unwrap(), Some(true));

    cache.remove("t1");
    assert_eq!(*observed.lock().unwrap(), Some(false));
}

#[test]
fn test_listener_may_mutate_the_cache() {
    let cache = Arc::new(LocalCache::new());
    let log = Arc::new(Mutex::new(Vec::new()));

    let weak = Arc::downgrade(&cache);
    cache.subscribe(Arc::new(move |event: &CacheEvent| {
        if let (Some(cache), CacheEvent::Added(task)) = (weak.upgrade(), event) {
            if task.id == "a" {
                cache.upsert(Task::new("Follow-up").with_id("b"));
            }
        }
    }));
    cache.subscribe(recorder("r", &log));

    cache.upsert(Task::new("Original").with_id("a"));

    assert!(cache.contains("b"));
    assert_eq!(*log.lock().unwrap(), vec!["r:added:a", "r:added:b"]);

    cache.remove("b");
    assert_eq!(log.lock().unwrap().last().map(String::as_str), Some("r:deleted:b"));
}

#[test]
fn test_filtered_reads() {
    let cache = LocalCache::new();
    let mut with_notes = Task::new("Groceries").with_id("g").with_category("home");
    with_notes.description = Some("Buy MILK and eggs".to_string());
    with_notes.is_important = true;
    let mut done = Task::new("Milk the cow").with_id("m");
    done.set_completed(true, d(2025, 1, 1));
    cache.load(vec![with_notes, done, Task::new("Taxes").with_id("t").with_category("work")]);

    let sorted = |tasks: Vec<Task>| {
        let mut ids: Vec<String> = tasks.into_iter().map(|t| t.id).collect();
        ids.sort();
        ids
    };
    assert_eq!(sorted(cache.search("milk")), vec!["g", "m"]);
    assert_eq!(sorted(cache.search("  ")), vec!["g", "m", "t"]);
    assert!(cache.search("dentist").is_empty());
    assert_eq!(sorted(cache.by_category("home")), vec!["g"]);
    assert_eq!(sorted(cache.important()), vec!["g"]);
    assert_eq!(sorted(cache.completed()), vec!["m"]);
    assert_eq!(sorted(cache.incomplete()), vec!["g", "t"]);
}

#[test]
fn test_time_overdue_read() {
    let cache = LocalCache::new();
    let day = d(2025, 6, 1);
    let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
    cache.load(vec![
        Task::new("Early").with_id("e").with_due_date(day).with_due_time(nine),
        Task::new("Late").with_id("l").with_due_date(day).with_due_time(NaiveTime::from_hms_opt(18, 0, 0).unwrap()),
    ]);

    let overdue = cache.time_overdue(day, NaiveTime::from_hms_opt(12, 0, 0).unwrap());
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].id, "e");
}

#[test]
fn test_category_tombstones() {
    let cache = LocalCache::new();
    let work = Category::new("Work", "#ff0000");
    cache.upsert_category(work.clone());

    assert_eq!(cache.mark_category_deleted(&work.id).map(|c| c.id), Some(work.id.clone()));
    assert_eq!(cache.pending_category_deletes(), vec![work.id.clone()]);
    assert_eq!(cache.merge_remote_categories(vec![work.clone()]), 0);
    assert!(cache.categories().is_empty());

    assert!(cache.confirm_category_deleted(&work.id));
    assert_eq!(cache.merge_remote_categories(vec![work.clone()]), 1);

    // Re-creating a deleted category cancels the pending delete.
    cache.mark_category_deleted(&work.id);
    cache.upsert_category(work);
    assert!(cache.pending_category_deletes().is_empty());
}

#[test]
fn test_cache_stores_malformed_tasks() {
    let cache = LocalCache::new();
    let mut task = Task::new("").with_id("blank");
    task.due_date = Some(tasklane::model::CalendarDate::Unparsed("??".to_string()));

    cache.upsert(task);
    assert!(cache.contains("blank"));
    assert_eq!(cache.buckets(d(2024, 3, 1)).today.len(), 1);
}

#[test]
fn test_set_completed_keeps_invariant() {
    let cache = LocalCache::new();
    cache.upsert(Task::new("Laundry").with_id("t1"));

    let done = cache.set_completed("t1", true, d(2024, 3, 1)).unwrap();
    assert!(done.is_completed);
    assert!(done.completion_date.is_some());

    let reopened = cache.set_completed("t1", false, d(2024, 3, 2)).unwrap();
    assert!(!reopened.is_completed);
    assert!(reopened.completion_date.is_none());
    assert!(reopened.last_modified > done.last_modified);

    assert!(cache.set_completed("missing", true, d(2024, 3, 1)).is_none());
}

#[test]
fn test_mutations_mark_tasks_dirty() {
    let cache = LocalCache::new();
    cache.load(vec![Task::new("Clean").with_id("t1")]);
    assert!(!cache.is_dirty("t1"));

    cache.update("t1", |task| task.title = "Edited".to_string());
    assert!(cache.is_dirty("t1"));

    let revision = cache.pending("t1").unwrap().revision.unwrap();
    cache.update("t1", |task| task.is_important = true);

    // A stale revision must not clear a newer edit
    assert!(!cache.mark_clean("t1", revision));
    assert!(cache.is_dirty("t1"));

    let dirty = cache.dirty_tasks();
    assert_eq!(dirty.len(), 1);
    assert_eq!(dirty[0].task.title, "Edited");
    assert!(cache.mark_clean("t1", dirty[0].revision.unwrap()));
    assert!(cache.dirty_tasks().is_empty());
}

#[test]
fn test_mark_deleted_leaves_tombstone() {
    let cache = LocalCache::new();
    cache.load(vec![Task::new("Doomed").with_id("t1")]);

    let (task, revision) = cache.mark_deleted("t1").unwrap();
    assert_eq!(task.id, "t1");
    assert!(!cache.contains("t1"));
    assert_eq!(cache.pending_deletes(), vec![("t1".to_string(), revision)]);

    assert!(cache.confirm_deleted("t1", revision));
    assert!(cache.pending_deletes().is_empty());
}

#[test]
fn test_merge_remote_local_wins() {
    let cache = LocalCache::new();
    cache.load(vec![]);
    cache.upsert(Task::new("Local A").with_id("A").with_last_modified(100));

    let remote = vec![
        Task::new("Remote A").with_id("A").with_last_modified(200),
        Task::new("Remote B").with_id("B"),
    ];
    let outcome = cache.merge_remote(remote, MergePolicy::LocalWins, 1_000);

    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.kept_local, 1);
    let a = cache.get("A").unwrap();
    assert_eq!(a.title, "Local A");
    assert_eq!(a.last_modified, 100);
    assert!(cache.is_dirty("A"));
    assert!(cache.contains("B"));
    assert!(!cache.is_dirty("B"));
    assert_eq!(cache.last_pull(), Some(1_000));
}

#[test]
fn test_merge_remote_last_modified_wins() {
    let cache = LocalCache::new();
    cache.upsert(Task::new("Local A").with_id("A").with_last_modified(100));
    cache.upsert(Task::new("Local C").with_id("C").with_last_modified(300));

    let remote = vec![
        Task::new("Remote A").with_id("A").with_last_modified(200),
        Task::new("Remote C").with_id("C").with_last_modified(300),
    ];
    let outcome = cache.merge_remote(remote, MergePolicy::LastModifiedWins, 1_000);

    assert_eq!(outcome.replaced, 1);
    assert_eq!(cache.get("A").unwrap().title, "Remote A");
    assert!(!cache.is_dirty("A"));
    // Ties keep the local copy
    assert_eq!(cache.get("C").unwrap().title, "Local C");
}

#[test]
fn test_merge_skips_tasks_pending_delete() {
    let cache = LocalCache::new();
    cache.load(vec![Task::new("Gone").with_id("A")]);
    cache.mark_deleted("A");

    let outcome = cache.merge_remote(vec![Task::new("Gone").with_id("A")], MergePolicy::LocalWins, 1);
    assert_eq!(outcome.skipped_deleted, 1);
    assert!(!cache.contains("A"));
}

#[test]
fn test_merge_without_changes_stays_quiet_once_loaded() {
    let cache = LocalCache::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    cache.load(vec![Task::new("Same").with_id("A")]);
    cache.subscribe(recorder("a", &log));

    cache.merge_remote(vec![Task::new("Same").with_id("A")], MergePolicy::LocalWins, 1);
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_categories_and_orphans() {
    let cache = LocalCache::new();
    let mut work = Category::new("Work", "#ff0000");
    work.sort_order = 2;
    let mut home = Category::new("Home", "#00ff00");
    home.sort_order = 1;
    cache.load_categories(vec![work.clone(), home.clone()]);

    let names: Vec<String> = cache.categories().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["Home", "Work"]);

    let task = Task::new("Report").with_category(work.id.clone());
    assert_eq!(cache.category_for(&task).unwrap().name, "Work");

    cache.remove_category(&work.id);
    assert!(cache.category_for(&task).is_none());
}

#[tokio::test]
async fn test_wait_until_loaded_resolves_on_load() {
    let cache = Arc::new(LocalCache::new());

    let waiter = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            cache.wait_until_loaded().await;
            cache.len()
        })
    };

    tokio::task::yield_now().await;
    assert!(!waiter.is_finished());

    cache.load(vec![Task::new("Ready").with_id("t1")]);
    let len = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter should finish")
        .unwrap();
    assert_eq!(len, 1);

    // Already loaded: returns immediately
    cache.wait_until_loaded().await;
}

#[tokio::test]
async fn test_channel_listener_receives_events() {
    let cache = LocalCache::new();
    let (handle, mut rx) = cache.subscribe_channel();

    cache.upsert(Task::new("Async").with_id("t1"));
    cache.remove("t1");

    assert_eq!(rx.recv().await.unwrap().task_id(), Some("t1"));
    assert!(matches!(rx.recv().await.unwrap(), CacheEvent::Deleted(id) if id == "t1"));

    cache.unsubscribe(&handle);
    assert_eq!(cache.listener_count(), 0);
}

#[test]
fn test_concurrent_writers_and_readers() {
    let cache = Arc::new(LocalCache::new());
    let events = Arc::new(Mutex::new(0usize));
    {
        let events = Arc::clone(&events);
        cache.subscribe(Arc::new(move |_: &CacheEvent| {
            *events.lock().unwrap() += 1;
        }));
    }

    let mut handles = Vec::new();
    for worker in 0..4 {
        let cache = Arc::clone(&cache);
        handles.push(std::thread::spawn(move || {
            for i in 0..50 {
                let id = format!("w{}-{}", worker, i);
                cache.upsert(Task::new("Concurrent").with_id(id.clone()).with_due_date(d(2024, 3, 1)));
                // Readers never observe a half-applied map
                assert!(cache.query("2024/03/01").iter().any(|t| t.id == id));
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cache.len(), 200);
    assert_eq!(*events.lock().unwrap(), 200);
}
