//! In-process authoritative task store.
//!
//! [`LocalCache`] owns the canonical `id -> Task` map together with the
//! categories and the [`SyncCursor`]. All mutations go through it, and every
//! mutation is announced to the registered [`CacheListener`]s once it is
//! visible to readers.
//!
//! There is exactly one cache per process, but it is constructed explicitly
//! and shared as `Arc<LocalCache>`:
//!
//! ```rust
//! use std::sync::Arc;
//! use tasklane::cache::LocalCache;
//! use tasklane::model::Task;
//!
//! let cache = Arc::new(LocalCache::new());
//! cache.load(vec![Task::new("Buy milk").with_id("t1")]);
//! assert!(cache.is_loaded());
//! assert!(cache.get("t1").is_some());
//! ```

mod cursor;
mod events;

pub use cursor::SyncCursor;
pub use events::{CacheEvent, CacheListener, ChannelListener};

use chrono::{NaiveDate, NaiveTime};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::{self, ThreadId};
use tokio::sync::{mpsc, watch};

use crate::buckets::{self, TaskBuckets};
use crate::model::{Category, Task};
use crate::recurrence;

/// How a pulled remote task is reconciled with a local copy of the same id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// The local copy is kept unconditionally
    #[default]
    LocalWins,
    /// The copy with the greater `last_modified` is kept; local wins ties
    LastModifiedWins,
}

impl MergePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "local_wins" => Some(MergePolicy::LocalWins),
            "last_modified_wins" => Some(MergePolicy::LastModifiedWins),
            _ => None,
        }
    }
}

/// Counters describing what a remote merge did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub added: usize,
    pub replaced: usize,
    pub kept_local: usize,
    pub skipped_deleted: usize,
}

impl MergeOutcome {
    pub fn changed(&self) -> bool {
        self.added + self.replaced > 0
    }
}

/// A task read for pushing, with the dirty revision it was read at.
#[derive(Debug, Clone)]
pub struct PendingPush {
    pub task: Task,
    pub revision: Option<u64>,
}

#[derive(Default)]
struct CacheState {
    tasks: HashMap<String, Task>,
    categories: HashMap<String, Category>,
    // Categories deleted locally whose remote delete is not acknowledged yet.
    category_tombstones: HashSet<String>,
    cursor: SyncCursor,
}

impl CacheState {
    fn snapshot(&self) -> Vec<Task> {
        self.tasks.values().cloned().collect()
    }

    fn filtered(&self, keep: impl Fn(&Task) -> bool) -> Vec<Task> {
        self.tasks.values().filter(|task| keep(task)).cloned().collect()
    }
}

/// Marks the thread currently delivering events; cleared on drop, so a
/// panicking listener does not leave the cache stuck in delivery.
struct Delivering<'a> {
    owner: &'a Mutex<Option<ThreadId>>,
}

impl<'a> Delivering<'a> {
    fn enter(owner: &'a Mutex<Option<ThreadId>>) -> Self {
        *owner.lock().unwrap_or_else(PoisonError::into_inner) = Some(thread::current().id());
        Self { owner }
    }
}

impl Drop for Delivering<'_> {
    fn drop(&mut self) {
        *self.owner.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Thread-safe task cache with fan-out change notification.
pub struct LocalCache {
    state: RwLock<CacheState>,
    listeners: Mutex<Vec<Arc<dyn CacheListener>>>,
    // Serializes mutation + delivery so listeners see events in mutation order.
    delivery: Mutex<()>,
    // Events waiting for delivery, including those raised by listeners.
    pending_events: Mutex<VecDeque<CacheEvent>>,
    delivering: Mutex<Option<ThreadId>>,
    loaded: watch::Sender<bool>,
}

impl Default for LocalCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalCache {
    pub fn new() -> Self {
        let (loaded, _) = watch::channel(false);
        Self {
            state: RwLock::new(CacheState::default()),
            listeners: Mutex::new(Vec::new()),
            delivery: Mutex::new(()),
            pending_events: Mutex::new(VecDeque::new()),
            delivering: Mutex::new(None),
            loaded,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<Arc<dyn CacheListener>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pending_events(&self) -> MutexGuard<'_, VecDeque<CacheEvent>> {
        self.pending_events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn delivering_here(&self) -> bool {
        *self.delivering.lock().unwrap_or_else(PoisonError::into_inner) == Some(thread::current().id())
    }

    /// Apply `f` under the write lock, then deliver its event (if any) after
    /// the lock is released.
    ///
    /// A listener may mutate the cache from its callback: the change applies
    /// at once and its event is delivered after the one being handled.
    fn mutate<R>(&self, f: impl FnOnce(&mut CacheState) -> (R, Option<CacheEvent>)) -> R {
        if self.delivering_here() {
            let (result, event) = {
                let mut state = self.write();
                f(&mut state)
            };
            self.pending_events().extend(event);
            return result;
        }

        let _delivery = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
        let (result, event) = {
            let mut state = self.write();
            f(&mut state)
        };
        if let Some(event) = event {
            self.pending_events().push_back(event);
            self.deliver_pending();
        }
        result
    }

    fn deliver_pending(&self) {
        let _delivering = Delivering::enter(&self.delivering);
        loop {
            let next = self.pending_events().pop_front();
            let Some(event) = next else {
                break;
            };
            self.dispatch(&event);
        }
    }

    fn dispatch(&self, event: &CacheEvent) {
        let listeners = self.listeners().clone();
        for listener in &listeners {
            listener.on_event(event);
        }
    }

    // === Snapshot mutations ===

    /// Replace the whole snapshot and mark the cache as loaded.
    pub fn load(&self, tasks: Vec<Task>) {
        self.mutate(|state| {
            state.tasks = tasks.into_iter().map(|task| (task.id.clone(), task)).collect();
            state.cursor.reset();
            self.loaded.send_replace(true);
            debug!("Cache loaded with {} tasks", state.tasks.len());
            ((), Some(CacheEvent::BulkUpdated(state.snapshot())))
        })
    }

    /// Insert or replace a task by id and mark it dirty.
    ///
    /// Returns `true` when the id was not present before.
    pub fn upsert(&self, task: Task) -> bool {
        self.mutate(|state| {
            state.cursor.mark_dirty(&task.id);
            let existed = state.tasks.insert(task.id.clone(), task.clone()).is_some();
            let event = if existed {
                CacheEvent::Updated(task)
            } else {
                CacheEvent::Added(task)
            };
            (!existed, Some(event))
        })
    }

    /// Drop a task locally. Absent ids are a no-op.
    pub fn remove(&self, id: &str) -> Option<Task> {
        self.mutate(|state| match state.tasks.remove(id) {
            Some(task) => {
                state.cursor.forget(id);
                (Some(task), Some(CacheEvent::Deleted(id.to_string())))
            }
            None => (None, None),
        })
    }

    /// Remove a task and leave a tombstone to be pushed to the remote store.
    ///
    /// Returns the removed task and the tombstone revision.
    pub fn mark_deleted(&self, id: &str) -> Option<(Task, u64)> {
        self.mutate(|state| match state.tasks.remove(id) {
            Some(task) => {
                let revision = state.cursor.mark_deleted(id);
                (Some((task, revision)), Some(CacheEvent::Deleted(id.to_string())))
            }
            None => (None, None),
        })
    }

    /// Apply `edit` to a cached task, bump its modification time and mark it
    /// dirty.
    pub fn update<F>(&self, id: &str, edit: F) -> Option<Task>
    where
        F: FnOnce(&mut Task),
    {
        self.mutate(|state| {
            let Some(task) = state.tasks.get_mut(id) else {
                return (None, None);
            };
            edit(task);
            task.touch();
            let updated = task.clone();
            state.cursor.mark_dirty(id);
            (Some(updated.clone()), Some(CacheEvent::Updated(updated)))
        })
    }

    /// Complete or reopen a task through [`Task::set_completed`].
    pub fn set_completed(&self, id: &str, completed: bool, today: NaiveDate) -> Option<Task> {
        self.mutate(|state| {
            let Some(task) = state.tasks.get_mut(id) else {
                return (None, None);
            };
            task.set_completed(completed, today);
            let updated = task.clone();
            state.cursor.mark_dirty(id);
            (Some(updated.clone()), Some(CacheEvent::Updated(updated)))
        })
    }

    // === Reads (copy-on-read) ===

    pub fn get(&self, id: &str) -> Option<Task> {
        self.read().tasks.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().tasks.contains_key(id)
    }

    pub fn all(&self) -> Vec<Task> {
        self.read().snapshot()
    }

    pub fn len(&self) -> usize {
        self.read().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().tasks.is_empty()
    }

    /// Tasks active on a `YYYY/MM/DD` date, recomputed on every call.
    ///
    /// Before the first load this is simply empty.
    pub fn query(&self, date: &str) -> Vec<Task> {
        self.read()
            .tasks
            .values()
            .filter(|task| recurrence::is_active_on_str(task, date))
            .cloned()
            .collect()
    }

    pub fn query_date(&self, date: NaiveDate) -> Vec<Task> {
        self.read()
            .tasks
            .values()
            .filter(|task| recurrence::is_active_on(task, date))
            .cloned()
            .collect()
    }

    /// Tasks whose title or description contains `query`, ignoring case.
    /// A blank query matches every task.
    pub fn search(&self, query: &str) -> Vec<Task> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.all();
        }
        self.read().filtered(|task| {
            task.title.to_lowercase().contains(&needle)
                || task
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
        })
    }

    pub fn by_category(&self, category_id: &str) -> Vec<Task> {
        self.read().filtered(|task| task.category_id.as_deref() == Some(category_id))
    }

    pub fn important(&self) -> Vec<Task> {
        self.read().filtered(|task| task.is_important)
    }

    pub fn completed(&self) -> Vec<Task> {
        self.read().filtered(|task| task.is_completed)
    }

    pub fn incomplete(&self) -> Vec<Task> {
        self.read().filtered(|task| !task.is_completed)
    }

    /// Incomplete tasks due `today` whose due time has already passed.
    pub fn time_overdue(&self, today: NaiveDate, now: NaiveTime) -> Vec<Task> {
        self.read().filtered(|task| buckets::is_time_overdue(task, today, now))
    }

    /// Bucketize the current snapshot against `today`.
    pub fn buckets(&self, today: NaiveDate) -> TaskBuckets {
        buckets::bucketize(self.read().tasks.values(), today)
    }

    // === Loaded state ===

    pub fn is_loaded(&self) -> bool {
        *self.loaded.borrow()
    }

    /// Resolve once the first snapshot has been loaded.
    pub async fn wait_until_loaded(&self) {
        let mut rx = self.loaded.subscribe();
        // The sender lives as long as `self`, so this cannot close early.
        let _ = rx.wait_for(|loaded| *loaded).await;
    }

    // === Listeners ===

    /// Register a listener. Registering the same listener twice is a no-op.
    pub fn subscribe(&self, listener: Arc<dyn CacheListener>) -> bool {
        let mut listeners = self.listeners();
        if listeners.iter().any(|l| events::same_listener(l, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Unregister a listener. Unknown listeners are ignored.
    pub fn unsubscribe(&self, listener: &Arc<dyn CacheListener>) -> bool {
        let mut listeners = self.listeners();
        let before = listeners.len();
        listeners.retain(|l| !events::same_listener(l, listener));
        listeners.len() != before
    }

    /// Subscribe a channel-backed listener.
    ///
    /// Returns the listener handle (for [`unsubscribe`](Self::unsubscribe))
    /// and the receiving end.
    pub fn subscribe_channel(&self) -> (Arc<dyn CacheListener>, mpsc::UnboundedReceiver<CacheEvent>) {
        let (listener, rx) = ChannelListener::new();
        let handle: Arc<dyn CacheListener> = listener;
        self.subscribe(handle.clone());
        (handle, rx)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    // === Sync bookkeeping ===

    /// Every cached task with its dirty revision (if dirty).
    pub fn pending_push(&self) -> Vec<PendingPush> {
        let state = self.read();
        state
            .tasks
            .values()
            .map(|task| PendingPush {
                task: task.clone(),
                revision: state.cursor.revision_of(&task.id),
            })
            .collect()
    }

    /// One task with its dirty revision.
    pub fn pending(&self, id: &str) -> Option<PendingPush> {
        let state = self.read();
        state.tasks.get(id).map(|task| PendingPush {
            task: task.clone(),
            revision: state.cursor.revision_of(id),
        })
    }

    /// Only the dirty tasks.
    pub fn dirty_tasks(&self) -> Vec<PendingPush> {
        let state = self.read();
        state
            .cursor
            .dirty_ids()
            .into_iter()
            .filter_map(|id| {
                state.tasks.get(&id).map(|task| PendingPush {
                    task: task.clone(),
                    revision: state.cursor.revision_of(&id),
                })
            })
            .collect()
    }

    pub fn pending_deletes(&self) -> Vec<(String, u64)> {
        self.read().cursor.tombstones()
    }

    pub fn is_dirty(&self, id: &str) -> bool {
        self.read().cursor.is_dirty(id)
    }

    pub fn pending_count(&self) -> usize {
        self.read().cursor.pending_count()
    }

    pub fn last_pull(&self) -> Option<i64> {
        self.read().cursor.last_pull()
    }

    /// Clear the dirty flag of `id` if it was not modified since `revision`.
    pub fn mark_clean(&self, id: &str, revision: u64) -> bool {
        self.write().cursor.clear_dirty(id, revision)
    }

    /// Purge the tombstone of `id` after the remote delete was acknowledged.
    pub fn confirm_deleted(&self, id: &str, revision: u64) -> bool {
        self.write().cursor.clear_tombstone(id, revision)
    }

    /// Re-key a task that had no id yet.
    pub fn assign_id(&self, old: &str, new: &str) -> bool {
        self.mutate(|state| {
            if state.tasks.contains_key(new) {
                return (false, None);
            }
            let Some(mut task) = state.tasks.remove(old) else {
                return (false, None);
            };
            task.id = new.to_string();
            state.tasks.insert(new.to_string(), task);
            state.cursor.rename(old, new);
            (true, Some(CacheEvent::BulkUpdated(state.snapshot())))
        })
    }

    /// Merge a pulled remote snapshot.
    ///
    /// Remote tasks unknown locally are added clean; tasks with a pending
    /// local delete are skipped; known tasks follow `policy`.
    pub fn merge_remote(&self, remote: Vec<Task>, policy: MergePolicy, pulled_at: i64) -> MergeOutcome {
        self.mutate(|state| {
            let mut outcome = MergeOutcome::default();

            for task in remote {
                if state.cursor.is_tombstoned(&task.id) {
                    outcome.skipped_deleted += 1;
                    continue;
                }

                let take_remote = match state.tasks.get(&task.id) {
                    None => {
                        outcome.added += 1;
                        true
                    }
                    Some(local) => match policy {
                        MergePolicy::LastModifiedWins if task.last_modified > local.last_modified => {
                            outcome.replaced += 1;
                            true
                        }
                        _ => {
                            outcome.kept_local += 1;
                            false
                        }
                    },
                };

                if take_remote {
                    state.cursor.forget(&task.id);
                    state.tasks.insert(task.id.clone(), task);
                }
            }

            state.cursor.record_pull(pulled_at);
            let was_loaded = self.loaded.send_replace(true);
            let event = (outcome.changed() || !was_loaded).then(|| CacheEvent::BulkUpdated(state.snapshot()));
            (outcome, event)
        })
    }

    // === Categories ===

    pub fn load_categories(&self, categories: Vec<Category>) {
        let mut state = self.write();
        state.categories = categories.into_iter().map(|c| (c.id.clone(), c)).collect();
        state.category_tombstones.clear();
    }

    pub fn upsert_category(&self, category: Category) -> bool {
        let mut state = self.write();
        state.category_tombstones.remove(&category.id);
        state.categories.insert(category.id.clone(), category).is_none()
    }

    /// Drop a category locally without scheduling a remote delete.
    pub fn remove_category(&self, id: &str) -> Option<Category> {
        self.write().categories.remove(id)
    }

    /// Drop a category and remember to delete it remotely.
    ///
    /// The tombstone is left even when the id is not cached, so a category
    /// only known remotely is still deleted there.
    pub fn mark_category_deleted(&self, id: &str) -> Option<Category> {
        let mut state = self.write();
        state.category_tombstones.insert(id.to_string());
        state.categories.remove(id)
    }

    /// Category ids deleted locally but not yet remotely, sorted.
    pub fn pending_category_deletes(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read().category_tombstones.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Forget the tombstone of `id` after the remote delete was acknowledged.
    pub fn confirm_category_deleted(&self, id: &str) -> bool {
        self.write().category_tombstones.remove(id)
    }

    /// Categories ordered by `sort_order`, then name.
    pub fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = self.read().categories.values().cloned().collect();
        categories.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
        categories
    }

    /// Resolve a task's category; orphaned ids resolve to `None`.
    pub fn category_for(&self, task: &Task) -> Option<Category> {
        let id = task.category_id.as_deref()?;
        self.read().categories.get(id).cloned()
    }

    /// Add remote categories unknown locally. Categories pending a remote
    /// delete are skipped. Returns how many were added.
    pub fn merge_remote_categories(&self, remote: Vec<Category>) -> usize {
        let mut state = self.write();
        let mut added = 0;
        for category in remote {
            if state.category_tombstones.contains(&category.id) {
                debug!("Skipping category {} pending delete", category.id);
                continue;
            }
            if !state.categories.contains_key(&category.id) {
                state.categories.insert(category.id.clone(), category);
                added += 1;
            }
        }
        added
    }
}
