//! PostgreSQL repositories and blob storage backends.
//!
//! Each repository wraps a borrowed connection (or transaction) and returns models from
//! [`crate::db::models`]:
//!
//! ```ignore
//! let mut conn = pool.acquire().await?;
//! let files = Files::new(&mut conn).list(&FileFilter::by_org("org_9")).await?;
//! ```
//!
//! - [`Users`]: users by token identifier, membership replacement
//! - [`Files`]: file records, listed per organization in insertion order
//! - [`StorageObjects`]: metadata of uploaded objects
//! - [`file_storage`]: where the uploaded bytes live

pub mod file_storage;
pub mod files;
pub mod repository;
pub mod storage_objects;
pub mod users;

pub use files::Files;
pub use repository::Repository;
pub use storage_objects::StorageObjects;
pub use users::Users;
