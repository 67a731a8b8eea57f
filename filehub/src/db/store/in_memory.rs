use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::Store;
use crate::db::{
    errors::{DbError, Result},
    models::{
        files::{FileCreateDBRequest, FileDBResponse},
        storage_objects::{StorageObjectCreateDBRequest, StorageObjectDBResponse},
        users::UserDBResponse,
    },
};
use crate::types::{FileId, OrgId, StorageId, UserId};

#[derive(Default)]
struct Tables {
    users: HashMap<String, UserDBResponse>,
    /// Insertion order is list order
    files: Vec<FileDBResponse>,
    storage_objects: HashMap<StorageId, StorageObjectDBResponse>,
}

/// [`Store`] keeping its tables in process memory.
///
/// Enforces the same constraints as the PostgreSQL schema: unique token identifiers and upload
/// ids, and file records that must point at an existing storage object.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_user_by_token_identifier(&self, token_identifier: &str) -> Result<Option<UserDBResponse>> {
        Ok(self.tables.read().users.get(token_identifier).cloned())
    }

    async fn get_or_create_user(&self, token_identifier: &str) -> Result<UserDBResponse> {
        let mut tables = self.tables.write();
        let user = tables
            .users
            .entry(token_identifier.to_string())
            .or_insert_with(|| UserDBResponse {
                id: Uuid::new_v4(),
                token_identifier: token_identifier.to_string(),
                org_ids: Vec::new(),
                created_at: Utc::now(),
            });
        Ok(user.clone())
    }

    async fn replace_org_memberships(&self, user_id: UserId, org_ids: &[OrgId]) -> Result<()> {
        let mut tables = self.tables.write();
        let user = tables.users.values_mut().find(|u| u.id == user_id).ok_or(DbError::NotFound)?;
        user.org_ids = org_ids.to_vec();
        Ok(())
    }

    async fn create_file(&self, request: &FileCreateDBRequest) -> Result<FileDBResponse> {
        let mut tables = self.tables.write();
        if !tables.storage_objects.contains_key(&request.file_id) {
            return Err(DbError::ForeignKeyViolation {
                constraint: Some("files_file_id_fkey".to_string()),
                table: Some("files".to_string()),
                message: format!("storage object {} does not exist", request.file_id),
            });
        }

        let file = FileDBResponse {
            id: Uuid::new_v4(),
            name: request.name.clone(),
            org_id: request.org_id.clone(),
            file_id: request.file_id,
            created_at: Utc::now(),
        };
        tables.files.push(file.clone());
        Ok(file)
    }

    async fn get_file(&self, id: FileId) -> Result<Option<FileDBResponse>> {
        Ok(self.tables.read().files.iter().find(|f| f.id == id).cloned())
    }

    async fn list_files_by_org(&self, org_id: &str) -> Result<Vec<FileDBResponse>> {
        Ok(self
            .tables
            .read()
            .files
            .iter()
            .filter(|f| f.org_id == org_id)
            .cloned()
            .collect())
    }

    async fn create_storage_object(&self, request: &StorageObjectCreateDBRequest) -> Result<StorageObjectDBResponse> {
        let mut tables = self.tables.write();
        if tables
            .storage_objects
            .values()
            .any(|o| o.upload_id == request.upload_id || o.id == request.id)
        {
            return Err(DbError::UniqueViolation {
                constraint: Some("storage_objects_upload_id_key".to_string()),
                table: Some("storage_objects".to_string()),
                message: format!("upload {} already stored", request.upload_id),
            });
        }

        let object = StorageObjectDBResponse {
            id: request.id,
            upload_id: request.upload_id,
            storage_key: request.storage_key.clone(),
            content_type: request.content_type.clone(),
            size_bytes: request.size_bytes,
            uploaded_by: request.uploaded_by.clone(),
            created_at: Utc::now(),
        };
        tables.storage_objects.insert(object.id, object.clone());
        Ok(object)
    }

    async fn get_storage_object(&self, id: StorageId) -> Result<Option<StorageObjectDBResponse>> {
        Ok(self.tables.read().storage_objects.get(&id).cloned())
    }

    async fn delete_storage_object(&self, id: StorageId) -> Result<bool> {
        let mut tables = self.tables.write();
        if tables.files.iter().any(|f| f.file_id == id) {
            return Err(DbError::ForeignKeyViolation {
                constraint: Some("files_file_id_fkey".to_string()),
                table: Some("files".to_string()),
                message: format!("storage object {id} is referenced by a file"),
            });
        }
        Ok(tables.storage_objects.remove(&id).is_some())
    }
}
