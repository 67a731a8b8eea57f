//! The database collaborator behind every request handler.
//!
//! [`Store`] is what handlers talk to. [`PostgresStore`] runs the repositories from
//! [`crate::db::handlers`] against a pool; [`InMemoryStore`] keeps the same tables in process
//! memory for development and tests. Both report constraint failures as the same
//! [`DbError`](crate::db::errors::DbError) variants.

use async_trait::async_trait;

use crate::db::{
    errors::Result,
    models::{
        files::{FileCreateDBRequest, FileDBResponse},
        storage_objects::{StorageObjectCreateDBRequest, StorageObjectDBResponse},
        users::UserDBResponse,
    },
};
use crate::types::{FileId, OrgId, StorageId, UserId};

mod in_memory;
mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Indexed lookup of a user by token identifier
    async fn get_user_by_token_identifier(&self, token_identifier: &str) -> Result<Option<UserDBResponse>>;

    /// Fetch the user for a token identifier, creating it without memberships on first sight
    async fn get_or_create_user(&self, token_identifier: &str) -> Result<UserDBResponse>;

    /// Replace a user's memberships with `org_ids`, in order
    async fn replace_org_memberships(&self, user_id: UserId, org_ids: &[OrgId]) -> Result<()>;

    /// Insert a file record. Fails with a foreign key violation if `file_id` names no stored object.
    async fn create_file(&self, request: &FileCreateDBRequest) -> Result<FileDBResponse>;

    async fn get_file(&self, id: FileId) -> Result<Option<FileDBResponse>>;

    /// Indexed lookup of all files of an organization, in insertion order
    async fn list_files_by_org(&self, org_id: &str) -> Result<Vec<FileDBResponse>>;

    /// Record an uploaded object. Fails with a unique violation if the upload id was used before.
    async fn create_storage_object(&self, request: &StorageObjectCreateDBRequest) -> Result<StorageObjectDBResponse>;

    async fn get_storage_object(&self, id: StorageId) -> Result<Option<StorageObjectDBResponse>>;

    /// Delete an object's metadata, returning whether it existed. Fails with a foreign key
    /// violation while a file references it.
    async fn delete_storage_object(&self, id: StorageId) -> Result<bool>;
}
