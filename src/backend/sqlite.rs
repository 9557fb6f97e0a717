//! Remote store backed by a SQLite document database.

use async_trait::async_trait;
use log::warn;
use sea_orm::{DbErr, TransactionTrait};
use serde_json::Value;

use super::document;
use super::{BackendError, ItemFailure, RemoteStore, Scope};
use crate::model::{Category, Task};
use crate::repositories::{CategoryDocumentRepository, TaskDocumentRepository};
use crate::storage::DocumentDb;

pub struct SqliteStore {
    db: DocumentDb,
}

impl SqliteStore {
    pub fn new(db: DocumentDb) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DocumentDb {
        &self.db
    }
}

fn store_error(e: anyhow::Error) -> BackendError {
    match e.downcast_ref::<DbErr>() {
        Some(DbErr::Conn(_)) | Some(DbErr::ConnectionAcquire(_)) => BackendError::Network(e.to_string()),
        _ => BackendError::Other(e.to_string()),
    }
}

fn encode_body(task: &Task) -> Result<String, BackendError> {
    serde_json::to_string(&document::encode_task(task)).map_err(|e| BackendError::InvalidData(e.to_string()))
}

#[async_trait]
impl RemoteStore for SqliteStore {
    fn store_type(&self) -> &str {
        "sqlite"
    }

    async fn pull(&self, scope: &Scope) -> Result<Vec<Task>, BackendError> {
        let rows = TaskDocumentRepository::get_for_scope(&self.db.conn, scope.key())
            .await
            .map_err(store_error)?;

        let mut tasks = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_str::<Value>(&row.body) {
                Ok(value) => match document::decode_task_value(&row.id, &value) {
                    Some(task) => tasks.push(task),
                    None => warn!("⚠️ Skipping non-object task document {}", row.id),
                },
                Err(e) => warn!("⚠️ Skipping unreadable task document {}: {}", row.id, e),
            }
        }
        Ok(tasks)
    }

    async fn push_one(&self, scope: &Scope, task: &Task) -> Result<(), BackendError> {
        if task.id.is_empty() {
            return Err(BackendError::InvalidData("task has no id".to_string()));
        }
        let body = encode_body(task)?;
        TaskDocumentRepository::upsert(&self.db.conn, scope.key(), &task.id, body, task.last_modified)
            .await
            .map_err(store_error)
    }

    /// Batch upsert inside a single transaction. Rows the database rejects
    /// are reported as failures while the others are committed.
    async fn push_many(&self, scope: &Scope, tasks: &[Task]) -> Result<Vec<ItemFailure>, BackendError> {
        let txn = self
            .db
            .conn
            .begin()
            .await
            .map_err(|e| store_error(e.into()))?;

        let mut failures = Vec::new();
        for task in tasks {
            if task.id.is_empty() {
                failures.push(ItemFailure {
                    id: task.id.clone(),
                    message: "task has no id".to_string(),
                });
                continue;
            }
            let body = match encode_body(task) {
                Ok(body) => body,
                Err(e) => {
                    failures.push(ItemFailure {
                        id: task.id.clone(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            // Each row gets its own savepoint so one rejected row does not
            // abort the rest of the batch.
            let row = txn.begin().await.map_err(|e| store_error(e.into()))?;
            match TaskDocumentRepository::upsert(&row, scope.key(), &task.id, body, task.last_modified).await {
                Ok(()) => row.commit().await.map_err(|e| store_error(e.into()))?,
                Err(e) => {
                    let e = store_error(e);
                    if e.is_connectivity() {
                        return Err(e);
                    }
                    warn!("❌ Rejected task document {}: {}", task.id, e);
                    row.rollback().await.map_err(|e| store_error(e.into()))?;
                    failures.push(ItemFailure {
                        id: task.id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        txn.commit().await.map_err(|e| store_error(e.into()))?;
        Ok(failures)
    }

    async fn delete(&self, scope: &Scope, id: &str) -> Result<(), BackendError> {
        TaskDocumentRepository::delete(&self.db.conn, scope.key(), id)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn pull_categories(&self, scope: &Scope) -> Result<Vec<Category>, BackendError> {
        let rows = CategoryDocumentRepository::get_for_scope(&self.db.conn, scope.key())
            .await
            .map_err(store_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match serde_json::from_str::<Value>(&row.body) {
                Ok(value) => document::decode_category(&row.id, &value),
                Err(e) => {
                    warn!("⚠️ Skipping unreadable category document {}: {}", row.id, e);
                    None
                }
            })
            .collect())
    }

    async fn push_category(&self, scope: &Scope, category: &Category) -> Result<(), BackendError> {
        let body = serde_json::to_string(&document::encode_category(category))
            .map_err(|e| BackendError::InvalidData(e.to_string()))?;
        CategoryDocumentRepository::upsert(&self.db.conn, scope.key(), &category.id, body)
            .await
            .map_err(store_error)
    }

    async fn delete_category(&self, scope: &Scope, id: &str) -> Result<(), BackendError> {
        CategoryDocumentRepository::delete(&self.db.conn, scope.key(), id)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}
