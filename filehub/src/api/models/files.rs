use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::db::models::files::FileDBResponse;
use crate::types::{FileId, OrgId, StorageId};

/// Body of `createFile`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileCreate {
    /// Display name; duplicates are allowed
    pub name: String,
    /// Storage reference returned by the upload
    #[schema(value_type = String, format = "uuid")]
    pub file_id: StorageId,
    /// Organization the file is shared with
    pub org_id: OrgId,
}

/// Query parameters of `getFiles`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListFilesQuery {
    /// Organization whose files to list. Without it the list is empty.
    pub org_id: Option<OrgId>,
}

/// A file record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: FileId,
    pub name: String,
    pub org_id: OrgId,
    #[schema(value_type = String, format = "uuid")]
    pub file_id: StorageId,
    pub created_at: DateTime<Utc>,
}

impl From<FileDBResponse> for FileResponse {
    fn from(file: FileDBResponse) -> Self {
        Self {
            id: file.id,
            name: file.name,
            org_id: file.org_id,
            file_id: file.file_id,
            created_at: file.created_at,
        }
    }
}
