use anyhow::{Context, Result};
use log::debug;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::Path;

use crate::entities::{category_document, task_document};

/// SQLite database holding remote task and category documents.
#[derive(Clone)]
pub struct DocumentDb {
    pub conn: DatabaseConnection,
}

impl DocumentDb {
    /// Open (or create) the database file at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
            }
        }

        let url = format!("sqlite://{}?mode=rwc", path.display());
        let mut options = ConnectOptions::new(url);
        options.max_connections(4).min_connections(1).sqlx_logging(false);

        let conn = Database::connect(options)
            .await
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Self::with_connection(conn).await
    }

    /// Open a private in-memory database.
    pub async fn in_memory() -> Result<Self> {
        // A single connection: each in-memory connection is its own database.
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).min_connections(1).sqlx_logging(false);

        let conn = Database::connect(options)
            .await
            .context("Failed to open in-memory database")?;
        Self::with_connection(conn).await
    }

    async fn with_connection(conn: DatabaseConnection) -> Result<Self> {
        let db = Self { conn };
        db.init_schema().await?;
        Ok(db)
    }

    /// Initialize database schema
    async fn init_schema(&self) -> Result<()> {
        create_table(&self.conn, task_document::Entity).await?;
        create_table(&self.conn, category_document::Entity).await?;
        debug!("Document schema ready");
        Ok(())
    }

    /// Clear all data from the database
    pub async fn clear_all_data(&self) -> Result<()> {
        task_document::Entity::delete_many().exec(&self.conn).await?;
        category_document::Entity::delete_many().exec(&self.conn).await?;
        Ok(())
    }
}

async fn create_table<E>(conn: &DatabaseConnection, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    conn.execute(backend.build(&statement)).await?;
    Ok(())
}
