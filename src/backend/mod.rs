//! Remote store abstraction.
//!
//! This module defines the interface every remote document store must
//! implement, the per-user [`Scope`] documents live under, and the common
//! error type.

use async_trait::async_trait;
use uuid::Uuid;

use crate::constants::{CATEGORIES_NODE, TASKS_NODE, USERS_NODE};
use crate::model::{Category, Task};

pub mod document;
pub mod factory;
pub mod memory;
pub mod sqlite;

/// Common error types for remote store operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Backend error: {0}")]
    Other(String),
}

impl BackendError {
    /// Whether the store as a whole is unreachable, as opposed to a single
    /// item being rejected.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, BackendError::Network(_) | BackendError::Auth(_))
    }
}

/// One item rejected during a batch push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub id: String,
    pub message: String,
}

/// Per-user namespace in the remote store.
///
/// The key is derived from the user's stable identifier with the characters
/// document paths reserve replaced, so `jane.doe@mail.com` becomes
/// `jane_doe_at_mail_com`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    key: String,
}

impl Scope {
    pub fn for_user(user_id: &str) -> Self {
        let mut key = String::with_capacity(user_id.len());
        for c in user_id.chars() {
            match c {
                '@' => key.push_str("_at_"),
                '.' | '#' | '$' | '[' | ']' | '/' => key.push('_'),
                other => key.push(other),
            }
        }
        Self { key }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn tasks_path(&self) -> String {
        format!("{}/{}/{}", USERS_NODE, self.key, TASKS_NODE)
    }

    pub fn categories_path(&self) -> String {
        format!("{}/{}/{}", USERS_NODE, self.key, CATEGORIES_NODE)
    }

    pub fn task_path(&self, id: &str) -> String {
        format!("{}/{}", self.tasks_path(), id)
    }
}

/// Remote document store that tasks and categories are reconciled against.
///
/// Writes are upserts keyed by id, so pushing the same document twice leaves
/// the store unchanged.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Returns the store type identifier (e.g., "memory", "sqlite").
    fn store_type(&self) -> &str;

    /// Generate an id for a task that does not have one yet.
    fn new_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    // Tasks
    async fn pull(&self, scope: &Scope) -> Result<Vec<Task>, BackendError>;
    async fn push_one(&self, scope: &Scope, task: &Task) -> Result<(), BackendError>;
    async fn delete(&self, scope: &Scope, id: &str) -> Result<(), BackendError>;

    /// Upsert a batch, collecting per-item failures.
    ///
    /// A connectivity error aborts the batch and is returned as `Err`; any
    /// other error only fails the item it belongs to.
    async fn push_many(&self, scope: &Scope, tasks: &[Task]) -> Result<Vec<ItemFailure>, BackendError> {
        let mut failures = Vec::new();
        for task in tasks {
            match self.push_one(scope, task).await {
                Ok(()) => {}
                Err(e) if e.is_connectivity() => return Err(e),
                Err(e) => failures.push(ItemFailure {
                    id: task.id.clone(),
                    message: e.to_string(),
                }),
            }
        }
        Ok(failures)
    }

    // Categories
    async fn pull_categories(&self, scope: &Scope) -> Result<Vec<Category>, BackendError>;
    async fn push_category(&self, scope: &Scope, category: &Category) -> Result<(), BackendError>;
    async fn delete_category(&self, scope: &Scope, id: &str) -> Result<(), BackendError>;
}
