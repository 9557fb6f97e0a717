use log::{debug, info, warn};

use crate::model::{Task, TaskError};
use crate::sync::{SyncError, SyncService};
use crate::utils::datetime;

impl SyncService {
    /// Creates a task locally and pushes it when sync is enabled.
    ///
    /// The task is validated first and gets an id from the store if it has
    /// none. A failed push is logged and leaves the task dirty for the next
    /// [`push_all`](Self::push_all).
    ///
    /// # Errors
    /// Returns [`SyncError::InvalidTask`] if the title is empty
    pub async fn create_task(&self, mut task: Task) -> Result<Task, SyncError> {
        task.validate()?;
        if !task.has_id() {
            task.id = self.store.new_id();
        }

        let id = task.id.clone();
        self.cache.upsert(task);
        info!("✅ Task created: {}", id);

        self.push_task(&id).await;
        self.cache
            .get(&id)
            .ok_or_else(|| TaskError::NotFound(id).into())
    }

    /// Edits a cached task and pushes it when sync is enabled.
    ///
    /// Completion state is not changed here; use
    /// [`set_task_completed`](Self::set_task_completed).
    ///
    /// # Errors
    /// Returns [`SyncError::InvalidTask`] if the task does not exist or the
    /// edit leaves it with an empty title
    pub async fn update_task<F>(&self, id: &str, edit: F) -> Result<Task, SyncError>
    where
        F: FnOnce(&mut Task),
    {
        let original = self
            .cache
            .get(id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;

        let mut edited = original.clone();
        edit(&mut edited);
        edited.id = original.id.clone();
        edited.is_completed = original.is_completed;
        edited.completion_date = original.completion_date.clone();
        edited.validate()?;

        let updated = self
            .cache
            .update(id, move |task| *task = edited)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        info!("✅ Task updated: {}", id);

        self.push_task(id).await;
        Ok(self.cache.get(id).unwrap_or(updated))
    }

    /// Completes or reopens a task and pushes it when sync is enabled.
    pub async fn set_task_completed(&self, id: &str, completed: bool) -> Result<Task, SyncError> {
        let updated = self
            .cache
            .set_completed(id, completed, datetime::today())
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;

        if completed {
            info!("✅ Task completed: {}", id);
        } else {
            info!("↩️ Task reopened: {}", id);
        }

        self.push_task(id).await;
        Ok(self.cache.get(id).unwrap_or(updated))
    }

    /// Deletes a task locally and removes it remotely when sync is enabled.
    ///
    /// The local copy disappears immediately. The remote delete is retried
    /// by [`push_all`](Self::push_all) until the store acknowledges it.
    pub async fn delete_task(&self, id: &str) -> Result<Task, SyncError> {
        let (task, revision) = self
            .cache
            .mark_deleted(id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        info!("✅ Task deleted: {}", id);

        if let Some(scope) = self.gate.scope() {
            match self.store.delete(&scope, id).await {
                Ok(()) => {
                    self.cache.confirm_deleted(id, revision);
                }
                Err(e) => warn!("❌ Failed to delete task {} remotely, will retry on next sync: {}", id, e),
            }
        }

        Ok(task)
    }

    /// Best-effort push of one cached task.
    async fn push_task(&self, id: &str) {
        let Some(scope) = self.gate.scope() else {
            return;
        };
        let Some(pending) = self.cache.pending(id) else {
            return;
        };

        match self.store.push_one(&scope, &pending.task).await {
            Ok(()) => {
                if let Some(revision) = pending.revision {
                    self.cache.mark_clean(id, revision);
                }
                debug!("Pushed task {}", id);
            }
            Err(e) => warn!("❌ Failed to push task {}, will retry on next sync: {}", id, e),
        }
    }
}
