/// Request to store binary content
#[derive(Debug, Clone)]
pub struct FileStorageRequest {
    pub content: bytes::Bytes,
    pub content_type: String,
}

/// Response from storing binary content
#[derive(Debug, Clone)]
pub struct FileStorageResponse {
    /// Backend-specific key, persisted on the storage object
    /// - Local: relative path (e.g., "3f/3f2a...dat")
    /// - Postgres: the blob row key
    pub storage_key: String,
}
