//! Database repository for uploaded object metadata.

use sqlx::PgConnection;
use tracing::instrument;

use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::storage_objects::{StorageObjectCreateDBRequest, StorageObjectDBResponse},
};
use crate::types::{StorageId, abbrev_uuid};

pub struct StorageObjects<'c> {
    db: &'c mut PgConnection,
}

impl<'c> StorageObjects<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Delete an object's metadata. Fails with a foreign key violation while a file references it.
    #[instrument(skip(self), fields(storage_id = %abbrev_uuid(&id)), err)]
    pub async fn delete(&mut self, id: StorageId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM storage_objects WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for StorageObjects<'c> {
    type CreateRequest = StorageObjectCreateDBRequest;
    type Response = StorageObjectDBResponse;
    type Id = StorageId;

    #[instrument(skip(self, request), fields(storage_id = %abbrev_uuid(&request.id), size = request.size_bytes), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let object = sqlx::query_as::<_, StorageObjectDBResponse>(
            r#"
            INSERT INTO storage_objects (id, upload_id, storage_key, content_type, size_bytes, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, upload_id, storage_key, content_type, size_bytes, uploaded_by, created_at
            "#,
        )
        .bind(request.id)
        .bind(request.upload_id)
        .bind(&request.storage_key)
        .bind(&request.content_type)
        .bind(request.size_bytes)
        .bind(&request.uploaded_by)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(object)
    }

    #[instrument(skip(self), fields(storage_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let object = sqlx::query_as::<_, StorageObjectDBResponse>(
            "SELECT id, upload_id, storage_key, content_type, size_bytes, uploaded_by, created_at FROM storage_objects WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(object)
    }
}
