//! HTTP API served under `/api/v1`.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request and response bodies
//!
//! # Routes
//!
//! - `POST /files/upload-url`: mint a single-use upload URL
//! - `POST /files`, `GET /files?orgId=`: create and list an organization's file records
//! - `GET /files/{file_id}/content`: download a file's bytes
//! - `POST /storage/upload/{token}`: target of an upload URL
//! - `DELETE /storage/{storage_id}`: remove an upload no file refers to
//!
//! The OpenAPI reference is served at `/docs`.

pub mod handlers;
pub mod models;
