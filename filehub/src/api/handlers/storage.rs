//! The storage collaborator: upload URLs resolve here.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    AppState,
    api::models::storage::UploadResponse,
    auth::{identity::Caller, upload_token::verify_upload_token},
    db::{
        errors::DbError,
        models::{file_storage::FileStorageRequest, storage_objects::StorageObjectCreateDBRequest},
    },
    errors::{Error, Result},
    types::{StorageId, abbrev_uuid},
};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[utoipa::path(
    post,
    path = "/storage/upload/{token}",
    tag = "storage",
    summary = "Upload a file's bytes",
    description = "Target of a URL returned by `POST /files/upload-url`. Each URL accepts exactly one upload.",
    params(
        ("token" = String, Path, description = "Upload token embedded in the upload URL")
    ),
    request_body(content = Vec<u8>, content_type = "application/octet-stream", description = "The file's bytes, sent with its own Content-Type"),
    responses(
        (status = 200, description = "Upload stored", body = UploadResponse),
        (status = 401, description = "Upload URL invalid or expired"),
        (status = 409, description = "Upload URL already used"),
        (status = 413, description = "Upload too large"),
        (status = 500, description = "Internal server error")
    )
)]
#[instrument(skip_all, fields(size = body.len()))]
pub async fn upload(State(state): State<AppState>, Path(token): Path<String>, headers: HeaderMap, body: Bytes) -> Result<Json<UploadResponse>> {
    let claims = verify_upload_token(&token, &state.config)?;

    let limit = state.config.storage.max_upload_size;
    if body.len() as u64 > limit {
        return Err(Error::PayloadTooLarge { limit });
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();
    let size_bytes = i64::try_from(body.len()).map_err(|_| Error::PayloadTooLarge { limit })?;

    let stored = state
        .file_storage
        .store(FileStorageRequest {
            content: body,
            content_type: content_type.clone(),
        })
        .await?;

    let request = StorageObjectCreateDBRequest {
        id: Uuid::new_v4(),
        upload_id: claims.jti,
        storage_key: stored.storage_key,
        content_type,
        size_bytes,
        uploaded_by: claims.sub,
    };
    match state.store.create_storage_object(&request).await {
        Ok(object) => {
            info!(storage_id = %abbrev_uuid(&object.id), "Stored upload");
            Ok(Json(UploadResponse { storage_id: object.id }))
        }
        Err(e) => {
            // The blob is unreachable without its metadata row
            if let Err(cleanup) = state.file_storage.delete(&request.storage_key).await {
                warn!(storage_key = %request.storage_key, "Failed to remove blob of rejected upload: {cleanup}");
            }
            Err(e.into())
        }
    }
}

#[utoipa::path(
    delete,
    path = "/storage/{storage_id}",
    tag = "storage",
    summary = "Delete an uploaded object",
    description = "Remove an object no file refers to. Only the uploader may delete it.",
    params(
        ("storage_id" = String, Path, description = "Storage ID returned by the upload")
    ),
    responses(
        (status = 204, description = "Object deleted"),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "No such object, or uploaded by someone else"),
        (status = 409, description = "A file still refers to the object"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("ProxyIdentity" = [])
    )
)]
#[instrument(skip_all, fields(storage_id = %abbrev_uuid(&storage_id)))]
pub async fn delete_storage_object(State(state): State<AppState>, caller: Caller, Path(storage_id): Path<StorageId>) -> Result<StatusCode> {
    let identity = caller.require()?;
    let not_found = || Error::NotFound {
        resource: "Storage object".to_string(),
        id: storage_id.to_string(),
    };

    let object = state.store.get_storage_object(storage_id).await?.ok_or_else(not_found)?;
    if object.uploaded_by != identity.token_identifier {
        return Err(not_found());
    }

    match state.store.delete_storage_object(storage_id).await {
        Ok(true) => {}
        Ok(false) => return Err(not_found()),
        Err(DbError::ForeignKeyViolation { .. }) => {
            return Err(Error::Conflict {
                message: "A file still refers to this object".to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    }

    if let Err(e) = state.file_storage.delete(&object.storage_key).await {
        warn!(storage_key = %object.storage_key, "Deleted object metadata but not its blob: {e}");
    }
    Ok(StatusCode::NO_CONTENT)
}
