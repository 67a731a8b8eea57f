use async_trait::async_trait;
use sqlx::PgPool;

use super::Store;
use crate::db::{
    errors::Result,
    handlers::{Files, Repository, StorageObjects, Users, files::FileFilter},
    models::{
        files::{FileCreateDBRequest, FileDBResponse},
        storage_objects::{StorageObjectCreateDBRequest, StorageObjectDBResponse},
        users::{UserCreateDBRequest, UserDBResponse},
    },
};
use crate::types::{FileId, OrgId, StorageId, UserId};

/// [`Store`] backed by the PostgreSQL repositories
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn get_user_by_token_identifier(&self, token_identifier: &str) -> Result<Option<UserDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).get_by_token_identifier(token_identifier).await
    }

    async fn get_or_create_user(&self, token_identifier: &str) -> Result<UserDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn)
            .get_or_create(&UserCreateDBRequest {
                token_identifier: token_identifier.to_string(),
            })
            .await
    }

    async fn replace_org_memberships(&self, user_id: UserId, org_ids: &[OrgId]) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).replace_org_memberships(user_id, org_ids).await
    }

    async fn create_file(&self, request: &FileCreateDBRequest) -> Result<FileDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Files::new(&mut conn).create(request).await
    }

    async fn get_file(&self, id: FileId) -> Result<Option<FileDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Files::new(&mut conn).get_by_id(id).await
    }

    async fn list_files_by_org(&self, org_id: &str) -> Result<Vec<FileDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Files::new(&mut conn).list(&FileFilter::by_org(org_id)).await
    }

    async fn create_storage_object(&self, request: &StorageObjectCreateDBRequest) -> Result<StorageObjectDBResponse> {
        let mut conn = self.pool.acquire().await?;
        StorageObjects::new(&mut conn).create(request).await
    }

    async fn get_storage_object(&self, id: StorageId) -> Result<Option<StorageObjectDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        StorageObjects::new(&mut conn).get_by_id(id).await
    }

    async fn delete_storage_object(&self, id: StorageId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        StorageObjects::new(&mut conn).delete(id).await
    }
}
