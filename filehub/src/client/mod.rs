//! Rust client for the file sharing API.
//!
//! [`FilesClient`] wraps the HTTP routes one method per operation. [`form::UploadForm`] drives the
//! two-phase upload through any [`form::UploadBackend`], of which `FilesClient` is the real one.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::{
    api::models::{
        files::{FileCreate, FileResponse},
        storage::{UploadResponse, UploadUrlResponse},
    },
    config::{DEFAULT_IDENTITY_HEADER, DEFAULT_ORGS_HEADER},
    types::{OrgId, StorageId},
};

pub mod form;

use form::{SelectedFile, UploadBackend};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request could not be sent or its response not read
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error status. `message` is its human-readable explanation.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// How the client identifies its caller
#[derive(Debug, Clone)]
pub enum Credentials {
    /// `Authorization: Bearer <token>`
    Session(String),
    /// Identity headers, for clients sitting behind the trusted proxy
    ProxyIdentity {
        token_identifier: String,
        org_ids: Option<Vec<OrgId>>,
    },
    Anonymous,
}

pub struct FilesClient {
    client: Client,
    base_url: Url,
    credentials: Credentials,
}

/// `Url::join` replaces the last segment of a base without a trailing slash
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Turn an error status into [`ClientError::Rejected`] carrying the server's message
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        body.trim().to_string()
    };
    debug!(%status, %message, "Request rejected");
    Err(ClientError::Rejected { status, message })
}

impl FilesClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// A client for the server at `base_url` (the server's public URL, without `/api/v1`)
    pub fn new(base_url: Url, credentials: Credentials) -> Result<Self> {
        let client = Client::builder().timeout(Self::REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: with_trailing_slash(base_url),
            credentials,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(&format!("api/v1/{path}"))
            .map_err(|e| ClientError::InvalidResponse(format!("cannot build URL for {path}: {e}")))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::Session(token) => request.bearer_auth(token),
            Credentials::ProxyIdentity {
                token_identifier,
                org_ids,
            } => {
                let request = request.header(DEFAULT_IDENTITY_HEADER, token_identifier);
                match org_ids {
                    Some(org_ids) => request.header(DEFAULT_ORGS_HEADER, org_ids.join(",")),
                    None => request,
                }
            }
            Credentials::Anonymous => request,
        }
    }

    /// `generateUploadUrl`
    #[instrument(skip(self))]
    pub async fn generate_upload_url(&self) -> Result<Url> {
        let request = self.client.post(self.endpoint("files/upload-url")?);
        let response = check(self.authorize(request).send().await?).await?;
        Ok(response.json::<UploadUrlResponse>().await?.upload_url)
    }

    /// Send `content` to an upload URL and return the storage reference. The URL itself
    /// authorizes the upload, so no credentials are attached.
    #[instrument(skip(self, upload_url, content), fields(size = content.len()))]
    pub async fn upload(&self, upload_url: &Url, content: Bytes, content_type: &str) -> Result<StorageId> {
        let response = self
            .client
            .post(upload_url.clone())
            .header(header::CONTENT_TYPE, content_type)
            .body(content)
            .send()
            .await?;
        let response = check(response).await?;
        Ok(response.json::<UploadResponse>().await?.storage_id)
    }

    /// `createFile`
    #[instrument(skip(self))]
    pub async fn create_file(&self, name: &str, file_id: StorageId, org_id: &str) -> Result<()> {
        let body = FileCreate {
            name: name.to_string(),
            file_id,
            org_id: org_id.to_string(),
        };
        let request = self.client.post(self.endpoint("files")?).json(&body);
        check(self.authorize(request).send().await?).await?;
        Ok(())
    }

    /// `getFiles`. Organizations the caller cannot access yield an empty list.
    #[instrument(skip(self))]
    pub async fn get_files(&self, org_id: &str) -> Result<Vec<FileResponse>> {
        let request = self.client.get(self.endpoint("files")?).query(&[("orgId", org_id)]);
        let response = check(self.authorize(request).send().await?).await?;
        Ok(response.json().await?)
    }

    /// Remove an uploaded object that no file refers to
    #[instrument(skip(self))]
    pub async fn delete_storage_object(&self, storage_id: StorageId) -> Result<()> {
        let request = self.client.delete(self.endpoint(&format!("storage/{storage_id}"))?);
        check(self.authorize(request).send().await?).await?;
        Ok(())
    }

    /// Download a file's bytes
    #[instrument(skip(self))]
    pub async fn get_file_content(&self, file: &FileResponse) -> Result<Bytes> {
        let request = self.client.get(self.endpoint(&format!("files/{}/content", file.id))?);
        let response = check(self.authorize(request).send().await?).await?;
        Ok(response.bytes().await?)
    }
}

#[async_trait]
impl UploadBackend for FilesClient {
    async fn generate_upload_url(&self) -> Result<Url> {
        FilesClient::generate_upload_url(self).await
    }

    async fn upload(&self, upload_url: &Url, file: &SelectedFile) -> Result<StorageId> {
        FilesClient::upload(self, upload_url, file.content.clone(), &file.content_type).await
    }

    async fn create_file(&self, name: &str, file_id: StorageId, org_id: &str) -> Result<()> {
        FilesClient::create_file(self, name, file_id, org_id).await
    }

    async fn delete_storage_object(&self, storage_id: StorageId) -> Result<()> {
        FilesClient::delete_storage_object(self, storage_id).await
    }
}
