use axum::{
    Json,
    body::Body,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::Response,
};
use tracing::{Span, debug, error, field, instrument};

use crate::{
    AppState,
    api::models::{
        files::{FileCreate, FileResponse, ListFilesQuery},
        storage::UploadUrlResponse,
    },
    auth::{
        access::{OrgAccess, has_access_to_org},
        identity::{Caller, Identity},
        upload_token::mint_upload_url,
    },
    db::{errors::DbError, models::files::{FileCreateDBRequest, FileDBResponse}},
    errors::{Error, Result},
    types::FileId,
};

#[utoipa::path(
    post,
    path = "/files/upload-url",
    tag = "files",
    summary = "Generate an upload URL",
    description = "Mint a single-use URL that accepts one upload of a file's bytes.",
    responses(
        (status = 200, description = "Upload URL", body = UploadUrlResponse),
        (status = 401, description = "Not logged in"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("ProxyIdentity" = [])
    )
)]
#[instrument(skip_all)]
pub async fn generate_upload_url(State(state): State<AppState>, caller: Caller) -> Result<Json<UploadUrlResponse>> {
    let identity = caller.require()?;
    let upload_url = mint_upload_url(identity, &state.config)?;
    Ok(Json(UploadUrlResponse { upload_url }))
}

#[utoipa::path(
    post,
    path = "/files",
    tag = "files",
    summary = "Create a file record",
    description = "Share an uploaded object with an organization. Names need not be unique.",
    request_body = FileCreate,
    responses(
        (status = 204, description = "File created"),
        (status = 400, description = "Malformed body, or fileId does not refer to an uploaded object"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "No access to the organization"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("ProxyIdentity" = [])
    )
)]
#[instrument(skip_all, fields(org_id = field::Empty))]
pub async fn create_file(
    State(state): State<AppState>,
    caller: Caller,
    body: std::result::Result<Json<FileCreate>, JsonRejection>,
) -> Result<StatusCode> {
    let identity = caller.require()?;
    let Json(create) = body.map_err(|rejection| Error::BadRequest {
        message: rejection.body_text(),
    })?;
    Span::current().record("org_id", create.org_id.as_str());

    let access = has_access_to_org(
        state.store.as_ref(),
        Some(identity),
        &create.org_id,
        state.config.auth.personal_org_match,
    )
    .await?;
    if !access.is_granted() {
        return Err(Error::AuthorizationDenied { org_id: create.org_id });
    }

    let request = FileCreateDBRequest {
        name: create.name,
        org_id: create.org_id,
        file_id: create.file_id,
    };
    match state.store.create_file(&request).await {
        Ok(_) => Ok(StatusCode::NO_CONTENT),
        Err(DbError::ForeignKeyViolation { .. }) => Err(Error::BadRequest {
            message: format!("fileId {} does not refer to an uploaded file", request.file_id),
        }),
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    get,
    path = "/files",
    tag = "files",
    summary = "List an organization's files",
    description = "Files in creation order. Anonymous callers and callers without access get an empty list.",
    params(ListFilesQuery),
    responses(
        (status = 200, description = "Files of the organization", body = Vec<FileResponse>)
    ),
    security(
        (),
        ("BearerAuth" = []),
        ("ProxyIdentity" = [])
    )
)]
#[instrument(skip_all, fields(org_id = field::Empty))]
pub async fn list_files(
    State(state): State<AppState>,
    caller: std::result::Result<Caller, Error>,
    query: std::result::Result<Query<ListFilesQuery>, QueryRejection>,
) -> Json<Vec<FileResponse>> {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            debug!("Malformed query, returning an empty list: {}", rejection.body_text());
            return Json(Vec::new());
        }
    };
    let Some(org_id) = query.org_id else {
        return Json(Vec::new());
    };
    Span::current().record("org_id", org_id.as_str());
    let caller = caller.unwrap_or_else(|e| {
        error!("Resolving the caller failed, treating them as anonymous: {e:#}");
        Caller::default()
    });

    match visible_files(&state, caller.identity(), &org_id).await {
        Ok(files) => Json(files.into_iter().map(FileResponse::from).collect()),
        Err(e) => {
            error!("Listing files failed, returning an empty list: {e:#}");
            Json(Vec::new())
        }
    }
}

/// The files of `org_id`, or none when the caller has no access
async fn visible_files(state: &AppState, caller: Option<&Identity>, org_id: &str) -> Result<Vec<FileDBResponse>> {
    let access = has_access_to_org(state.store.as_ref(), caller, org_id, state.config.auth.personal_org_match).await?;
    match access {
        OrgAccess::Granted { .. } => Ok(state.store.list_files_by_org(org_id).await?),
        OrgAccess::Denied => Ok(Vec::new()),
    }
}

#[utoipa::path(
    get,
    path = "/files/{file_id}/content",
    tag = "files",
    summary = "Download a file's content",
    params(
        ("file_id" = String, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "The stored bytes, with their content type"),
        (status = 404, description = "No such file, or no access to it"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("ProxyIdentity" = [])
    )
)]
#[instrument(skip_all, fields(file_id = %file_id))]
pub async fn get_file_content(State(state): State<AppState>, caller: Caller, Path(file_id): Path<FileId>) -> Result<Response> {
    let not_found = || Error::NotFound {
        resource: "File".to_string(),
        id: file_id.to_string(),
    };

    let file = state.store.get_file(file_id).await?.ok_or_else(not_found)?;
    let access = has_access_to_org(
        state.store.as_ref(),
        caller.identity(),
        &file.org_id,
        state.config.auth.personal_org_match,
    )
    .await?;
    if !access.is_granted() {
        return Err(not_found());
    }

    let object = state.store.get_storage_object(file.file_id).await?.ok_or_else(not_found)?;
    let content = match state.file_storage.retrieve(&object.storage_key).await {
        Ok(content) => content,
        Err(DbError::NotFound) => {
            error!(storage_key = %object.storage_key, "Stored object has no blob");
            return Err(Error::Internal {
                operation: format!("read content of file {file_id}"),
            });
        }
        Err(e) => return Err(e.into()),
    };

    Response::builder()
        .header(header::CONTENT_TYPE, object.content_type)
        .header(header::CONTENT_LENGTH, content.len())
        .body(Body::from(content))
        .map_err(|e| Error::Internal {
            operation: format!("build content response: {e}"),
        })
}
