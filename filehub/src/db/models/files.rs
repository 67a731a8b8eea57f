use chrono::{DateTime, Utc};

use crate::types::{FileId, OrgId, StorageId};

/// Database request for creating a file record
#[derive(Debug, Clone)]
pub struct FileCreateDBRequest {
    pub name: String,
    pub org_id: OrgId,
    pub file_id: StorageId,
}

/// Database response for a file record
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FileDBResponse {
    pub id: FileId,
    pub name: String,
    pub org_id: OrgId,
    /// The stored object holding this file's bytes
    pub file_id: StorageId,
    pub created_at: DateTime<Utc>,
}
