//! Base repository trait for database operations.

use crate::db::errors::Result;

/// A repository is a data access layer over one postgres table.
///
/// Records handled here are append-only from the application's point of view, so the trait only
/// covers creation and lookup. Table-specific queries live on the repositories themselves.
#[async_trait::async_trait]
pub trait Repository {
    /// The request type for creating entities
    type CreateRequest;

    /// The response/DTO type returned by operations
    type Response;

    /// The identifier type for lookups
    type Id: Send + Sync;

    /// Create a new entity
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response>;

    /// Get an entity by ID
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>>;
}
