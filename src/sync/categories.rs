use log::{info, warn};

use crate::backend::ItemFailure;
use crate::model::Category;
use crate::sync::{SyncError, SyncReport, SyncService};

impl SyncService {
    /// Get all categories from the cache (fast)
    pub fn get_categories(&self) -> Vec<Category> {
        self.cache.categories()
    }

    /// Creates a category locally and pushes it when sync is enabled.
    ///
    /// A failed push is logged; the category goes out with the next
    /// [`push_categories`](Self::push_categories).
    pub async fn create_category(&self, category: Category) -> Category {
        self.cache.upsert_category(category.clone());
        info!("✅ Category created: {}", category.name);

        if let Some(scope) = self.gate.scope() {
            if let Err(e) = self.store.push_category(&scope, &category).await {
                warn!("❌ Failed to push category {}: {}", category.id, e);
            }
        }
        category
    }

    /// Deletes a category locally and remotely.
    ///
    /// Tasks still pointing at it simply resolve to no category. A failed
    /// remote delete is logged and retried by the next
    /// [`push_categories`](Self::push_categories); until then pulls do not
    /// bring the category back.
    pub async fn delete_category(&self, id: &str) -> Option<Category> {
        let removed = self.cache.mark_category_deleted(id);
        info!("🗑️ Category deleted: {}", id);

        if let Some(scope) = self.gate.scope() {
            match self.store.delete_category(&scope, id).await {
                Ok(()) => {
                    self.cache.confirm_category_deleted(id);
                }
                Err(e) => warn!("❌ Failed to delete category {} remotely: {}", id, e),
            }
        }
        removed
    }

    /// Send pending category deletes, then upload every cached category.
    pub async fn push_categories(&self) -> Result<SyncReport, SyncError> {
        let Some(scope) = self.gate.scope() else {
            return Ok(SyncReport::default());
        };

        let mut report = SyncReport::default();
        for id in self.cache.pending_category_deletes() {
            match self.store.delete_category(&scope, &id).await {
                Ok(()) => {
                    self.cache.confirm_category_deleted(&id);
                    report.deleted += 1;
                }
                Err(e) if e.is_connectivity() => return Err(e.into()),
                Err(e) => {
                    warn!("❌ Failed to delete category {} remotely: {}", id, e);
                    report.failed.push(ItemFailure {
                        id,
                        message: e.to_string(),
                    });
                }
            }
        }

        for category in self.cache.categories() {
            match self.store.push_category(&scope, &category).await {
                Ok(()) => report.pushed += 1,
                Err(e) if e.is_connectivity() => return Err(e.into()),
                Err(e) => report.failed.push(ItemFailure {
                    id: category.id.clone(),
                    message: e.to_string(),
                }),
            }
        }
        Ok(report)
    }

    /// Merge remote categories into the cache; local copies win.
    pub async fn pull_categories(&self) -> Result<SyncReport, SyncError> {
        let Some(scope) = self.gate.scope() else {
            return Ok(SyncReport::default());
        };

        let remote = self.store.pull_categories(&scope).await?;
        info!("✅ Fetched {} categories from {} store", remote.len(), self.store.store_type());
        let added = self.cache.merge_remote_categories(remote);

        Ok(SyncReport {
            pulled: added,
            ..SyncReport::default()
        })
    }
}
