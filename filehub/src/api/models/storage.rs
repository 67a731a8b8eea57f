use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

use crate::types::StorageId;

/// Result of `generateUploadUrl`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    /// Single-use URL accepting one `POST` of the file's bytes
    #[schema(value_type = String, format = "uri")]
    pub upload_url: Url,
}

/// Result of a completed upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[schema(value_type = String, format = "uuid")]
    pub storage_id: StorageId,
}
