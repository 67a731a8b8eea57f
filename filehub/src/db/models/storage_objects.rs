use chrono::{DateTime, Utc};

use crate::types::{StorageId, UploadId};

/// Database request for recording an uploaded object
#[derive(Debug, Clone)]
pub struct StorageObjectCreateDBRequest {
    pub id: StorageId,
    /// Taken from the upload token. Unique, which makes every upload URL single-use.
    pub upload_id: UploadId,
    pub storage_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    /// Token identifier of the caller the upload URL was minted for
    pub uploaded_by: String,
}

/// Database response for an uploaded object
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StorageObjectDBResponse {
    pub id: StorageId,
    pub upload_id: UploadId,
    pub storage_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
}
