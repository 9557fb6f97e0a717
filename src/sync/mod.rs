//! Synchronization service module for the tasklane application.
//!
//! This module provides the [`SyncService`] struct which reconciles the
//! [`LocalCache`] with a [`RemoteStore`]. The cache is always the source the
//! application reads from; the service pushes local changes out and merges
//! remote changes in, under an offline-first model:
//! - local mutations apply to the cache first and are pushed best-effort
//! - `push_all` uploads every cached task (full overwrite, idempotent)
//! - `pull_and_merge` adds remote tasks the cache has never seen
//! - nothing happens while sync is switched off or no user is signed in

pub mod categories;
pub mod gate;
pub mod tasks;

pub use gate::SyncGate;

use log::{debug, error, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::MutexGuard;
use tokio::task::{AbortHandle, JoinHandle};

use crate::backend::{BackendError, ItemFailure, RemoteStore, Scope};
use crate::cache::{LocalCache, MergePolicy};
use crate::constants::{
    LOG_ERROR_PULL, LOG_ERROR_PUSH, LOG_PULL_DONE, LOG_PUSH_DONE, LOG_SYNC_DISABLED, LOG_SYNC_STARTED, SYNC_CANCELLED,
};
use crate::model::{Task, TaskError};
use crate::utils::datetime;

/// Errors surfaced by reconciliation and sync-aware mutations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SyncError {
    /// The remote store could not be reached; the cache was left unchanged
    #[error("Remote store unreachable: {0}")]
    Connectivity(BackendError),

    /// The remote store rejected the whole operation
    #[error("Remote store error: {0}")]
    Backend(BackendError),

    #[error(transparent)]
    InvalidTask(#[from] TaskError),

    #[error("A sync is already in progress")]
    AlreadyRunning,
}

impl SyncError {
    /// Whether trying again later may succeed. Sync failures are never fatal.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, SyncError::InvalidTask(_))
    }
}

impl From<BackendError> for SyncError {
    fn from(e: BackendError) -> Self {
        if e.is_connectivity() {
            SyncError::Connectivity(e)
        } else {
            SyncError::Backend(e)
        }
    }
}

/// Keep only the first failure reported for each id of the pushed batch.
fn relevant_failures(failures: Vec<ItemFailure>, batch: &[Task]) -> Vec<ItemFailure> {
    let mut seen = HashSet::new();
    failures
        .into_iter()
        .filter(|failure| {
            let known = batch.iter().any(|t| t.id == failure.id);
            if !known {
                warn!("⚠️ Ignoring failure for task {} that was not pushed", failure.id);
            }
            known && seen.insert(failure.id.clone())
        })
        .collect()
}

/// Outcome of a reconciliation step.
///
/// A disabled sync produces the empty report, the same as a sync with
/// nothing to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Tasks written to the remote store
    pub pushed: usize,
    /// Remote tasks that were added to (or replaced in) the cache
    pub pulled: usize,
    /// Remote deletes acknowledged
    pub deleted: usize,
    /// Items the remote store rejected; everything else stays committed
    pub failed: Vec<ItemFailure>,
}

impl SyncReport {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.id.as_str()).collect()
    }

    fn absorb(&mut self, other: SyncReport) {
        self.pushed += other.pushed;
        self.pulled += other.pulled;
        self.deleted += other.deleted;
        self.failed.extend(other.failed);
    }
}

/// Represents the current status of a synchronization operation.
///
/// This enum is used to communicate the state of sync operations to the UI,
/// allowing for proper status indicators and error handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// Sync service is not currently performing any operations
    Idle,
    /// A sync operation is currently in progress
    InProgress,
    /// The last sync operation completed successfully
    Success,
    /// The last sync operation failed with an error
    Error {
        /// Human-readable error message describing what went wrong
        message: String,
        /// Whether retrying later may succeed
        retriable: bool,
    },
}

/// Holds the single-sync lock for one [`SyncService::sync`] run.
///
/// If the run is dropped before [`finish`](Self::finish), the sync future
/// was cancelled: the status becomes a retriable error and the lock is
/// released with the guard.
struct SyncRun<'a> {
    _lock: MutexGuard<'a, ()>,
    status: &'a Mutex<SyncStatus>,
    finished: bool,
}

impl<'a> SyncRun<'a> {
    fn start(lock: MutexGuard<'a, ()>, status: &'a Mutex<SyncStatus>) -> Self {
        *status.lock().unwrap_or_else(PoisonError::into_inner) = SyncStatus::InProgress;
        Self {
            _lock: lock,
            status,
            finished: false,
        }
    }

    fn finish(mut self, status: SyncStatus) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status;
        self.finished = true;
    }
}

impl Drop for SyncRun<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("{}", SYNC_CANCELLED);
            *self.status.lock().unwrap_or_else(PoisonError::into_inner) = SyncStatus::Error {
                message: SYNC_CANCELLED.to_string(),
                retriable: true,
            };
        }
    }
}

/// Kinds of background operation that supersede one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SyncOp {
    Pull,
    Push,
}

/// Service that reconciles the local cache with a remote store.
///
/// The `SyncService` is cheap to clone; clones share the cache, the store,
/// the gate and the in-flight bookkeeping.
///
/// # Example
/// ```rust,no_run
/// use std::sync::Arc;
/// use tasklane::backend::memory::InMemoryStore;
/// use tasklane::cache::LocalCache;
/// use tasklane::sync::{SyncGate, SyncService};
///
/// # async fn example() -> Result<(), tasklane::sync::SyncError> {
/// let cache = Arc::new(LocalCache::new());
/// let store = Arc::new(InMemoryStore::new());
/// let gate = Arc::new(SyncGate::new(true, Some("jane@example.com".to_string())));
/// let sync_service = SyncService::new(cache.clone(), store, gate);
///
/// sync_service.initial_load().await?;
/// let report = sync_service.sync().await?;
/// println!("pushed {} tasks", report.pushed);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SyncService {
    cache: Arc<LocalCache>,
    store: Arc<dyn RemoteStore>,
    gate: Arc<SyncGate>,
    merge_policy: MergePolicy,
    status: Arc<Mutex<SyncStatus>>,
    sync_lock: Arc<tokio::sync::Mutex<()>>,
    in_flight: Arc<Mutex<HashMap<SyncOp, AbortHandle>>>,
}

impl SyncService {
    pub fn new(cache: Arc<LocalCache>, store: Arc<dyn RemoteStore>, gate: Arc<SyncGate>) -> Self {
        Self {
            cache,
            store,
            gate,
            merge_policy: MergePolicy::default(),
            status: Arc::new(Mutex::new(SyncStatus::Idle)),
            sync_lock: Arc::new(tokio::sync::Mutex::new(())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    pub fn cache(&self) -> &Arc<LocalCache> {
        &self.cache
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    pub fn gate(&self) -> &Arc<SyncGate> {
        &self.gate
    }

    pub fn merge_policy(&self) -> MergePolicy {
        self.merge_policy
    }

    /// Status of the last [`sync`](Self::sync) run.
    pub async fn status(&self) -> SyncStatus {
        self.status.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Checks if a full synchronization is currently in progress.
    pub async fn is_syncing(&self) -> bool {
        self.sync_lock.try_lock().is_err()
    }

    fn active_scope(&self) -> Option<Scope> {
        let scope = self.gate.scope();
        if scope.is_none() {
            debug!("{}", LOG_SYNC_DISABLED);
        }
        scope
    }

    /// Upload every cached task and every pending delete.
    ///
    /// Tasks without an id get one from the store first. Rejected items are
    /// reported in [`SyncReport::failed`] and stay dirty. If the store is
    /// unreachable the cache is not touched at all.
    pub async fn push_all(&self) -> Result<SyncReport, SyncError> {
        let Some(scope) = self.active_scope() else {
            return Ok(SyncReport::default());
        };

        let mut report = SyncReport::default();

        // Remote deletes first; tombstones are only purged once acknowledged.
        let mut confirmed = Vec::new();
        for (id, revision) in self.cache.pending_deletes() {
            match self.store.delete(&scope, &id).await {
                Ok(()) => confirmed.push((id, revision)),
                Err(e) if e.is_connectivity() => {
                    error!("{}: {}", LOG_ERROR_PUSH, e);
                    return Err(e.into());
                }
                Err(e) => {
                    warn!("❌ Failed to delete task {} remotely: {}", id, e);
                    report.failed.push(ItemFailure {
                        id,
                        message: e.to_string(),
                    });
                }
            }
        }

        let pending = self.cache.pending_push();
        let mut renamed = None;
        let mut tasks = Vec::with_capacity(pending.len());
        let mut revisions = Vec::with_capacity(pending.len());
        for mut entry in pending {
            if !entry.task.has_id() {
                let id = self.store.new_id();
                debug!("Assigning id {} to new task '{}'", id, entry.task.title);
                renamed = Some(id.clone());
                entry.task.id = id;
            }
            revisions.push((entry.task.id.clone(), entry.revision));
            tasks.push(entry.task);
        }

        let failures = match self.store.push_many(&scope, &tasks).await {
            Ok(failures) => relevant_failures(failures, &tasks),
            Err(e) => {
                error!("{}: {}", LOG_ERROR_PUSH, e);
                return Err(e.into());
            }
        };

        // Everything below only touches the cache.
        for (id, revision) in &confirmed {
            self.cache.confirm_deleted(id, *revision);
        }
        if let Some(new_id) = &renamed {
            self.cache.assign_id("", new_id);
        }
        for (id, revision) in revisions {
            if failures.iter().any(|f| f.id == id) {
                continue;
            }
            if let Some(revision) = revision {
                self.cache.mark_clean(&id, revision);
            }
        }

        for failure in &failures {
            warn!("❌ Failed to push task {}: {}", failure.id, failure.message);
        }

        report.pushed = tasks.iter().filter(|t| !failures.iter().any(|f| f.id == t.id)).count();
        report.deleted = confirmed.len();
        report.failed.extend(failures);
        info!("{} ({} pushed, {} deleted)", LOG_PUSH_DONE, report.pushed, report.deleted);
        Ok(report)
    }

    /// Fetch the remote snapshot and merge it into the cache.
    ///
    /// Under the default policy the local copy of a known task always wins;
    /// the remote store is only authoritative for tasks the cache has never
    /// seen.
    pub async fn pull_and_merge(&self) -> Result<SyncReport, SyncError> {
        let Some(scope) = self.active_scope() else {
            return Ok(SyncReport::default());
        };

        let remote = match self.store.pull(&scope).await {
            Ok(tasks) => {
                info!("✅ Fetched {} tasks from {} store", tasks.len(), self.store.store_type());
                tasks
            }
            Err(e) => {
                error!("{}: {}", LOG_ERROR_PULL, e);
                return Err(e.into());
            }
        };

        let outcome = self
            .cache
            .merge_remote(remote, self.merge_policy, datetime::now_millis());
        info!(
            "{} ({} added, {} replaced, {} kept local)",
            LOG_PULL_DONE, outcome.added, outcome.replaced, outcome.kept_local
        );

        Ok(SyncReport {
            pulled: outcome.added + outcome.replaced,
            ..SyncReport::default()
        })
    }

    /// Performs a full synchronization: categories, then pull, then push.
    ///
    /// Only one full sync runs at a time; a concurrent call fails with
    /// [`SyncError::AlreadyRunning`]. No retries happen here.
    pub async fn sync(&self) -> Result<SyncReport, SyncError> {
        let Ok(lock) = self.sync_lock.try_lock() else {
            return Err(SyncError::AlreadyRunning);
        };

        // Released on every exit path, including cancellation.
        let run = SyncRun::start(lock, &self.status);
        let result = self.perform_sync().await;

        run.finish(match &result {
            Ok(_) => SyncStatus::Success,
            Err(e) => SyncStatus::Error {
                message: e.to_string(),
                retriable: e.is_retriable(),
            },
        });

        result
    }

    async fn perform_sync(&self) -> Result<SyncReport, SyncError> {
        if !self.gate.should_sync() {
            info!("{}", LOG_SYNC_DISABLED);
            return Ok(SyncReport::default());
        }

        info!("{}", LOG_SYNC_STARTED);
        self.pull_categories().await?;
        let mut report = self.pull_and_merge().await?;
        report.absorb(self.push_all().await?);

        // Task counts only; category failures are still reported.
        let categories = self.push_categories().await?;
        report.failed.extend(categories.failed);
        Ok(report)
    }

    /// Populate the cache for the first time.
    ///
    /// With sync enabled the remote snapshot becomes the cache content;
    /// otherwise the cache is loaded empty. Either way waiters on
    /// [`LocalCache::wait_until_loaded`] are released. On error the cache is
    /// left untouched.
    pub async fn initial_load(&self) -> Result<usize, SyncError> {
        let Some(scope) = self.active_scope() else {
            self.cache.load(Vec::new());
            return Ok(0);
        };

        let tasks = self.store.pull(&scope).await.map_err(|e| {
            error!("{}: {}", LOG_ERROR_PULL, e);
            SyncError::from(e)
        })?;
        let categories = self.store.pull_categories(&scope).await?;

        let count = tasks.len();
        self.cache.load_categories(categories);
        self.cache.load(tasks);
        info!("✅ Loaded {} tasks from {} store", count, self.store.store_type());
        Ok(count)
    }

    fn replace_in_flight(&self, op: SyncOp, handle: AbortHandle) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = in_flight.insert(op, handle) {
            if !previous.is_finished() {
                debug!("Cancelling superseded {:?}", op);
                previous.abort();
            }
        }
    }

    /// Run [`pull_and_merge`](Self::pull_and_merge) in the background,
    /// cancelling a previous background pull that has not finished.
    pub fn spawn_pull(&self) -> JoinHandle<Result<SyncReport, SyncError>> {
        let service = self.clone();
        let handle = tokio::spawn(async move { service.pull_and_merge().await });
        self.replace_in_flight(SyncOp::Pull, handle.abort_handle());
        handle
    }

    /// Run [`push_all`](Self::push_all) in the background, cancelling a
    /// previous background push that has not finished.
    pub fn spawn_push(&self) -> JoinHandle<Result<SyncReport, SyncError>> {
        let service = self.clone();
        let handle = tokio::spawn(async move { service.push_all().await });
        self.replace_in_flight(SyncOp::Push, handle.abort_handle());
        handle
    }

    /// Run [`sync`](Self::sync) every `period` until the handle is aborted.
    ///
    /// Failures are logged and the loop keeps going.
    pub fn spawn_auto_sync(&self, period: Duration) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                match service.sync().await {
                    Ok(report) if report.is_partial() => {
                        warn!("⚠️ Auto-sync finished with {} failed items", report.failed.len())
                    }
                    Ok(_) => debug!("Auto-sync finished"),
                    Err(SyncError::AlreadyRunning) => debug!("Auto-sync skipped, sync already running"),
                    Err(e) => warn!("❌ Auto-sync failed: {}", e),
                }
            }
        })
    }

    /// Abort every background operation started by this service.
    pub fn cancel_all(&self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, handle) in in_flight.drain() {
            handle.abort();
        }
    }
}
