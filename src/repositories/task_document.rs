//! Task document repository for database operations.

use anyhow::Result;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};

use crate::entities::task_document;

/// Repository for task document database operations.
pub struct TaskDocumentRepository;

impl TaskDocumentRepository {
    /// Insert or overwrite the document stored under `(scope, id)`.
    pub async fn upsert<C>(conn: &C, scope: &str, id: &str, body: String, last_modified: i64) -> Result<()>
    where
        C: ConnectionTrait,
    {
        let model = task_document::ActiveModel {
            scope: ActiveValue::Set(scope.to_string()),
            id: ActiveValue::Set(id.to_string()),
            body: ActiveValue::Set(body),
            last_modified: ActiveValue::Set(last_modified),
        };

        task_document::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([task_document::Column::Scope, task_document::Column::Id])
                    .update_columns([task_document::Column::Body, task_document::Column::LastModified])
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;

        Ok(())
    }

    /// Get all documents of a scope ordered by id.
    pub async fn get_for_scope<C>(conn: &C, scope: &str) -> Result<Vec<task_document::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(task_document::Entity::find()
            .filter(task_document::Column::Scope.eq(scope))
            .order_by_asc(task_document::Column::Id)
            .all(conn)
            .await?)
    }

    /// Get a single document.
    pub async fn get_by_id<C>(conn: &C, scope: &str, id: &str) -> Result<Option<task_document::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(task_document::Entity::find_by_id((scope.to_string(), id.to_string()))
            .one(conn)
            .await?)
    }

    /// Delete a document. Returns whether a row was removed.
    pub async fn delete<C>(conn: &C, scope: &str, id: &str) -> Result<bool>
    where
        C: ConnectionTrait,
    {
        let result = task_document::Entity::delete_many()
            .filter(task_document::Column::Scope.eq(scope))
            .filter(task_document::Column::Id.eq(id))
            .exec(conn)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn count_for_scope<C>(conn: &C, scope: &str) -> Result<u64>
    where
        C: ConnectionTrait,
    {
        Ok(task_document::Entity::find()
            .filter(task_document::Column::Scope.eq(scope))
            .count(conn)
            .await?)
    }
}
