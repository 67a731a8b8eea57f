//! Test utilities: an in-memory application and request helpers.

use axum::http::StatusCode;
use axum_test::TestServer;
use bytes::Bytes;
use std::sync::Arc;
use tempfile::TempDir;
use url::Url;

use crate::{
    AppState,
    api::models::storage::{UploadResponse, UploadUrlResponse},
    auth::{identity::Identity, session::create_session_token},
    config::{Config, DatabaseConfig, FileStorageBackend},
    db::{InMemoryStore, handlers::file_storage::LocalFileStorage},
    types::{OrgId, StorageId},
};

pub const IDENTITY_HEADER: &str = "x-filehub-identity";
pub const ORGS_HEADER: &str = "x-filehub-orgs";

pub fn create_test_config() -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        public_url: Some("http://filehub.test/".parse().unwrap()),
        database: DatabaseConfig::Memory,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        ..Default::default()
    };
    config.auth.proxy_header.enabled = true;
    config
}

/// An application over a fresh in-memory store, with blobs in a temporary directory that lives as
/// long as the returned [`TempDir`].
pub fn create_test_app() -> (TestServer, TempDir) {
    create_test_app_with_config(create_test_config())
}

pub fn create_test_app_with_config(config: Config) -> (TestServer, TempDir) {
    let (state, blobs) = create_test_state(config);
    let router = crate::build_router(state).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to create test server");
    (server, blobs)
}

pub fn create_test_state(mut config: Config) -> (AppState, TempDir) {
    let blobs = tempfile::tempdir().expect("Failed to create blob directory");
    config.storage.backend = FileStorageBackend::Local {
        path: blobs.path().to_path_buf(),
    };

    let state = AppState::builder()
        .config(config)
        .store(Arc::new(InMemoryStore::new()))
        .file_storage(Arc::new(LocalFileStorage::new(blobs.path().to_path_buf())))
        .build();
    (state, blobs)
}

/// A session token for `token_identifier` signed with the test secret
pub fn session_token(token_identifier: &str, orgs: Option<Vec<OrgId>>) -> String {
    create_session_token(&Identity::new(token_identifier), orgs, &create_test_config()).expect("Failed to create session token")
}

/// Path and query of an absolute URL, for requests against a [`TestServer`]
pub fn local_path(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// Request an upload URL as `token_identifier`
pub async fn mint_upload_url(server: &TestServer, token_identifier: &str) -> Url {
    let response = server.post("/api/v1/files/upload-url").add_header(IDENTITY_HEADER, token_identifier).await;
    response.assert_status_ok();
    response.json::<UploadUrlResponse>().upload_url
}

/// Upload `content` as `token_identifier` and return its storage id
pub async fn upload_bytes(server: &TestServer, token_identifier: &str, content: &'static [u8], content_type: &str) -> StorageId {
    let upload_url = mint_upload_url(server, token_identifier).await;
    let response = server
        .post(&local_path(&upload_url))
        .content_type(content_type)
        .bytes(Bytes::from_static(content))
        .await;
    response.assert_status(StatusCode::OK);
    response.json::<UploadResponse>().storage_id
}
