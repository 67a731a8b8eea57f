//! Database record models.
//!
//! Request types (`*CreateDBRequest`) carry what a repository needs to insert a row; response
//! types (`*DBResponse`) are what every [`crate::db::Store`] implementation hands back, so the
//! PostgreSQL and in-memory stores are interchangeable above this layer.
//!
//! - [`users`]: known callers and their organization memberships
//! - [`files`]: organization-scoped file records
//! - [`storage_objects`]: metadata for uploaded binary content
//! - [`file_storage`]: requests and responses for blob backends

pub mod file_storage;
pub mod files;
pub mod storage_objects;
pub mod users;
