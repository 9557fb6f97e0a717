//! Category document repository for database operations.

use anyhow::Result;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::entities::category_document;

/// Repository for category document database operations.
pub struct CategoryDocumentRepository;

impl CategoryDocumentRepository {
    pub async fn upsert<C>(conn: &C, scope: &str, id: &str, body: String) -> Result<()>
    where
        C: ConnectionTrait,
    {
        let model = category_document::ActiveModel {
            scope: ActiveValue::Set(scope.to_string()),
            id: ActiveValue::Set(id.to_string()),
            body: ActiveValue::Set(body),
        };

        category_document::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([category_document::Column::Scope, category_document::Column::Id])
                    .update_column(category_document::Column::Body)
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;

        Ok(())
    }

    pub async fn get_for_scope<C>(conn: &C, scope: &str) -> Result<Vec<category_document::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(category_document::Entity::find()
            .filter(category_document::Column::Scope.eq(scope))
            .order_by_asc(category_document::Column::Id)
            .all(conn)
            .await?)
    }

    pub async fn delete<C>(conn: &C, scope: &str, id: &str) -> Result<bool>
    where
        C: ConnectionTrait,
    {
        let result = category_document::Entity::delete_many()
            .filter(category_document::Column::Scope.eq(scope))
            .filter(category_document::Column::Id.eq(id))
            .exec(conn)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
