//! Store factory for creating remote store instances from configuration.

use anyhow::{anyhow, Result};
use std::sync::Arc;

use super::{memory::InMemoryStore, sqlite::SqliteStore, RemoteStore};
use crate::config::Config;
use crate::constants::{STORE_MEMORY, STORE_SQLITE};
use crate::storage::DocumentDb;

/// Create the remote store selected by `config.sync.store`.
///
/// # Errors
/// Returns error if:
/// - Store type is unknown
/// - The SQLite database cannot be opened
pub async fn create_store(config: &Config) -> Result<Arc<dyn RemoteStore>> {
    match config.sync.store.as_str() {
        STORE_SQLITE => {
            let path = config.database_path()?;
            let db = DocumentDb::open(&path).await?;
            Ok(Arc::new(SqliteStore::new(db)))
        }
        STORE_MEMORY => Ok(Arc::new(InMemoryStore::new())),
        other => Err(anyhow!("Unknown store type: {}", other)),
    }
}
