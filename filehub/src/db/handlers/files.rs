//! Database repository for organization-scoped file records.

use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::files::{FileCreateDBRequest, FileDBResponse},
};
use crate::types::{FileId, OrgId, abbrev_uuid};

/// Filter for listing files
#[derive(Debug, Clone)]
pub struct FileFilter {
    pub org_id: OrgId,
}

impl FileFilter {
    pub fn by_org(org_id: impl Into<OrgId>) -> Self {
        Self { org_id: org_id.into() }
    }
}

pub struct Files<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Files<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// All files of one organization, in insertion order.
    #[instrument(skip(self), fields(org_id = %filter.org_id), err)]
    pub async fn list(&mut self, filter: &FileFilter) -> Result<Vec<FileDBResponse>> {
        let files = sqlx::query_as::<_, FileDBResponse>(
            "SELECT id, name, org_id, file_id, created_at FROM files WHERE org_id = $1 ORDER BY seq ASC",
        )
        .bind(&filter.org_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(files)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Files<'c> {
    type CreateRequest = FileCreateDBRequest;
    type Response = FileDBResponse;
    type Id = FileId;

    #[instrument(skip(self, request), fields(name = %request.name, org_id = %request.org_id), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let file = sqlx::query_as::<_, FileDBResponse>(
            r#"
            INSERT INTO files (id, name, org_id, file_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, org_id, file_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.name)
        .bind(&request.org_id)
        .bind(request.file_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(file)
    }

    #[instrument(skip(self), fields(file_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let file = sqlx::query_as::<_, FileDBResponse>("SELECT id, name, org_id, file_id, created_at FROM files WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        errors::DbError,
        handlers::StorageObjects,
        models::storage_objects::{StorageObjectCreateDBRequest, StorageObjectDBResponse},
    };
    use sqlx::PgPool;

    async fn stored_object(conn: &mut PgConnection) -> StorageObjectDBResponse {
        StorageObjects::new(conn)
            .create(&StorageObjectCreateDBRequest {
                id: Uuid::new_v4(),
                upload_id: Uuid::new_v4(),
                storage_key: "ab/abc.dat".to_string(),
                content_type: "application/pdf".to_string(),
                size_bytes: 3,
                uploaded_by: "user_42".to_string(),
            })
            .await
            .unwrap()
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
    async fn test_list_returns_org_files_in_insertion_order(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let object = stored_object(&mut conn).await;
        let mut repo = Files::new(&mut conn);

        for (name, org_id) in [("b.pdf", "org_1"), ("a.pdf", "org_1"), ("other.pdf", "org_2"), ("b.pdf", "org_1")] {
            repo.create(&FileCreateDBRequest {
                name: name.to_string(),
                org_id: org_id.to_string(),
                file_id: object.id,
            })
            .await
            .unwrap();
        }

        let files = repo.list(&FileFilter::by_org("org_1")).await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b.pdf", "a.pdf", "b.pdf"]);
        assert!(files.iter().all(|f| f.org_id == "org_1" && f.file_id == object.id));

        let first = repo.get_by_id(files[0].id).await.unwrap();
        assert_eq!(first.as_ref(), files.first());
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
    async fn test_unknown_storage_reference_is_rejected(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let err = Files::new(&mut conn)
            .create(&FileCreateDBRequest {
                name: "x.png".to_string(),
                org_id: "org_9".to_string(),
                file_id: Uuid::new_v4(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
