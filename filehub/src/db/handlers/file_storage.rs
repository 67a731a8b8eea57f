//! Blob backends holding uploaded bytes.
//!
//! Metadata about an upload lives in `storage_objects`; the bytes themselves go to one of these
//! backends, addressed by the key the backend returned from [`FileStorage::store`].

use async_trait::async_trait;
use bytes::Bytes;
use sqlx::PgPool;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

use crate::config::FileStorageBackend;
use crate::db::{
    errors::{DbError, Result},
    models::file_storage::{FileStorageRequest, FileStorageResponse},
};

/// Trait for file storage backends
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store content and return its storage key
    async fn store(&self, request: FileStorageRequest) -> Result<FileStorageResponse>;

    /// Retrieve content using its storage key
    async fn retrieve(&self, storage_key: &str) -> Result<Bytes>;

    /// Delete content using its storage key. Deleting a missing key is not an error.
    async fn delete(&self, storage_key: &str) -> Result<()>;
}

/// Build the configured backend. The postgres backend shares the application pool.
pub fn create_file_storage(backend: &FileStorageBackend, pool: Option<&PgPool>) -> Result<Arc<dyn FileStorage>> {
    match backend {
        FileStorageBackend::Local { path } => Ok(Arc::new(LocalFileStorage::new(path.clone()))),
        FileStorageBackend::Postgres => {
            let pool = pool.ok_or_else(|| DbError::Other(anyhow::anyhow!("postgres blob storage requires a postgres database")))?;
            Ok(Arc::new(PostgresFileStorage::new(pool.clone())))
        }
    }
}

// ============================================================================
// Local Filesystem Storage Implementation
// ============================================================================

/// Stores each blob as `{base}/{xx}/{uuid}.dat`, fanned out by the first two hex digits
pub struct LocalFileStorage {
    base_path: PathBuf,
}

impl LocalFileStorage {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Resolve a key below the base directory, refusing keys that could escape it
    fn resolve(&self, storage_key: &str) -> Result<PathBuf> {
        let relative = Path::new(storage_key);
        if relative.components().any(|c| !matches!(c, Component::Normal(_))) {
            return Err(DbError::NotFound);
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    #[instrument(skip(self, request), fields(size = request.content.len()), err)]
    async fn store(&self, request: FileStorageRequest) -> Result<FileStorageResponse> {
        let id = Uuid::new_v4().simple().to_string();
        let storage_key = format!("{}/{}.dat", &id[..2], id);
        let full_path = self.base_path.join(&storage_key);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&full_path).await?;
        file.write_all(&request.content).await?;
        file.sync_all().await?;

        Ok(FileStorageResponse { storage_key })
    }

    async fn retrieve(&self, storage_key: &str) -> Result<Bytes> {
        let content = fs::read(self.resolve(storage_key)?).await?;
        Ok(Bytes::from(content))
    }

    async fn delete(&self, storage_key: &str) -> Result<()> {
        match fs::remove_file(self.resolve(storage_key)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// PostgreSQL Storage Implementation
// ============================================================================

/// Stores blobs as `bytea` rows in the `storage_blobs` table
pub struct PostgresFileStorage {
    pool: PgPool,
}

impl PostgresFileStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileStorage for PostgresFileStorage {
    #[instrument(skip(self, request), fields(size = request.content.len()), err)]
    async fn store(&self, request: FileStorageRequest) -> Result<FileStorageResponse> {
        let storage_key = Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO storage_blobs (storage_key, content_type, content) VALUES ($1, $2, $3)")
            .bind(&storage_key)
            .bind(&request.content_type)
            .bind(request.content.as_ref())
            .execute(&self.pool)
            .await?;

        Ok(FileStorageResponse { storage_key })
    }

    async fn retrieve(&self, storage_key: &str) -> Result<Bytes> {
        let content = sqlx::query_scalar::<_, Vec<u8>>("SELECT content FROM storage_blobs WHERE storage_key = $1")
            .bind(storage_key)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::NotFound)?;

        Ok(Bytes::from(content))
    }

    async fn delete(&self, storage_key: &str) -> Result<()> {
        sqlx::query("DELETE FROM storage_blobs WHERE storage_key = $1")
            .bind(storage_key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
