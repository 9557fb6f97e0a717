//! In-memory remote store.
//!
//! Keeps documents per scope in a map, exactly as they would be stored
//! remotely, and can simulate an unreachable store or rejected items.

use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::document::{self, Document};
use super::{BackendError, RemoteStore, Scope};
use crate::model::{Category, Task};

#[derive(Default)]
struct MemoryState {
    tasks: HashMap<String, BTreeMap<String, Document>>,
    categories: HashMap<String, BTreeMap<String, Document>>,
    offline: bool,
    rejected: HashSet<String>,
    pushes: usize,
    latency: Duration,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every call fail with a network error until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// Reject pushes of the given task id with an invalid-data error.
    pub fn reject_id(&self, id: impl Into<String>) {
        self.state().rejected.insert(id.into());
    }

    /// Delay every call by `latency` before it touches the store.
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = latency;
    }

    async fn simulate_latency(&self) {
        let latency = self.state().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    pub fn clear_rejections(&self) {
        self.state().rejected.clear();
    }

    /// Store a raw document directly, bypassing encoding.
    pub fn insert_document(&self, scope: &Scope, id: &str, doc: Document) {
        self.state()
            .tasks
            .entry(scope.key().to_string())
            .or_default()
            .insert(id.to_string(), doc);
    }

    /// Raw documents stored for a scope, ordered by id.
    pub fn documents(&self, scope: &Scope) -> BTreeMap<String, Document> {
        self.state().tasks.get(scope.key()).cloned().unwrap_or_default()
    }

    pub fn document(&self, scope: &Scope, id: &str) -> Option<Document> {
        self.state().tasks.get(scope.key())?.get(id).cloned()
    }

    /// Number of successful task writes so far.
    pub fn push_count(&self) -> usize {
        self.state().pushes
    }

    fn check_online(state: &MemoryState) -> Result<(), BackendError> {
        if state.offline {
            Err(BackendError::Network("store is unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    fn store_type(&self) -> &str {
        "memory"
    }

    async fn pull(&self, scope: &Scope) -> Result<Vec<Task>, BackendError> {
        self.simulate_latency().await;
        let state = self.state();
        Self::check_online(&state)?;
        let tasks = state
            .tasks
            .get(scope.key())
            .map(|docs| docs.iter().map(|(id, doc)| document::decode_task(id, doc)).collect())
            .unwrap_or_default();
        Ok(tasks)
    }

    async fn push_one(&self, scope: &Scope, task: &Task) -> Result<(), BackendError> {
        self.simulate_latency().await;
        let mut state = self.state();
        Self::check_online(&state)?;
        if task.id.is_empty() {
            return Err(BackendError::InvalidData("task has no id".to_string()));
        }
        if state.rejected.contains(&task.id) {
            return Err(BackendError::InvalidData(format!("rejected task {}", task.id)));
        }
        debug!("Writing {}", scope.task_path(&task.id));
        state
            .tasks
            .entry(scope.key().to_string())
            .or_default()
            .insert(task.id.clone(), document::encode_task(task));
        state.pushes += 1;
        Ok(())
    }

    async fn delete(&self, scope: &Scope, id: &str) -> Result<(), BackendError> {
        self.simulate_latency().await;
        let mut state = self.state();
        Self::check_online(&state)?;
        if let Some(docs) = state.tasks.get_mut(scope.key()) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn pull_categories(&self, scope: &Scope) -> Result<Vec<Category>, BackendError> {
        self.simulate_latency().await;
        let state = self.state();
        Self::check_online(&state)?;
        let categories = state
            .categories
            .get(scope.key())
            .map(|docs| {
                docs.iter()
                    .filter_map(|(id, doc)| document::decode_category(id, &Value::Object(doc.clone())))
                    .collect()
            })
            .unwrap_or_default();
        Ok(categories)
    }

    async fn push_category(&self, scope: &Scope, category: &Category) -> Result<(), BackendError> {
        self.simulate_latency().await;
        let mut state = self.state();
        Self::check_online(&state)?;
        state
            .categories
            .entry(scope.key().to_string())
            .or_default()
            .insert(category.id.clone(), document::encode_category(category));
        Ok(())
    }

    async fn delete_category(&self, scope: &Scope, id: &str) -> Result<(), BackendError> {
        self.simulate_latency().await;
        let mut state = self.state();
        Self::check_online(&state)?;
        if let Some(docs) = state.categories.get_mut(scope.key()) {
            docs.remove(id);
        }
        Ok(())
    }
}
