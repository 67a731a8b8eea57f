//! Data access layer.
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (api::handlers)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │    Store    │  (db::store - PostgresStore | InMemoryStore)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries over a PgConnection)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! Uploaded bytes do not go through the store; they are kept by a
//! [`FileStorage`](handlers::file_storage::FileStorage) backend and referenced from the
//! `storage_objects` table.

pub mod errors;
pub mod handlers;
pub mod models;
pub mod store;

pub use store::{InMemoryStore, PostgresStore, Store};
