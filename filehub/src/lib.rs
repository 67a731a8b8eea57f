//! # filehub: organization-scoped file sharing
//!
//! `filehub` lets authenticated callers upload files into an organization and list the files of
//! organizations they can access. A single service plays every backend role the feature needs:
//! it verifies identities, holds the uploaded bytes and keeps the file records.
//!
//! ## Upload flow
//!
//! 1. `POST /api/v1/files/upload-url` mints a signed, single-use upload URL.
//! 2. The client sends the file's bytes to that URL and receives a `storageId`.
//! 3. `POST /api/v1/files` records `{name, fileId: storageId, orgId}` once
//!    [`auth::access::has_access_to_org`] grants access to `orgId`.
//!
//! `GET /api/v1/files?orgId=` lists an organization's files. Reads degrade to an empty list for
//! anonymous or unauthorized callers, while writes fail with a human-readable message.
//!
//! The [`client`] module drives the same flow from Rust, including the upload form state machine
//! and cleanup of uploads whose file record could not be created.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use filehub::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = filehub::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     filehub::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     Application::new(config)
//!         .await?
//!         .serve(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{self, HeaderValue},
    routing::{delete, get, post},
};
use bon::Builder;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::{
    config::{CorsOrigin, DatabaseConfig},
    db::{InMemoryStore, PostgresStore, Store, handlers::file_storage::{FileStorage, create_file_storage}},
    openapi::ApiDoc,
};
pub use config::Config;

/// Shared state handed to every handler.
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .store(Arc::new(InMemoryStore::new()))
///     .file_storage(file_storage)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    /// Users, memberships, file records and storage object metadata
    pub store: Arc<dyn Store>,
    /// Uploaded bytes
    pub file_storage: Arc<dyn FileStorage>,
}

/// Get the filehub database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.auth.security.cors;
    let allow_origin = if cors_config.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        if cors_config.allow_credentials {
            anyhow::bail!("CORS: a wildcard origin cannot be combined with allow_credentials");
        }
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::DELETE])
        .allow_headers([
            http::header::AUTHORIZATION,
            http::header::CONTENT_TYPE,
            http::HeaderName::from_bytes(config.auth.proxy_header.header_name.as_bytes())?,
            http::HeaderName::from_bytes(config.auth.proxy_header.orgs_header_name.as_bytes())?,
        ])
        .allow_credentials(cors_config.allow_credentials);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router: the API under `/api/v1`, `/healthz`, and the API reference at
/// `/docs`.
///
/// # Errors
///
/// Returns an error if the CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let upload_limit = usize::try_from(state.config.storage.max_upload_size).unwrap_or(usize::MAX);

    let api_routes = Router::new()
        .route("/files/upload-url", post(api::handlers::files::generate_upload_url))
        .route("/files", post(api::handlers::files::create_file))
        .route("/files", get(api::handlers::files::list_files))
        .route("/files/{file_id}/content", get(api::handlers::files::get_file_content))
        .route(
            "/storage/upload/{token}",
            post(api::handlers::storage::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/storage/{storage_id}", delete(api::handlers::storage::delete_storage_object));

    let cors_layer = create_cors_layer(&state.config)?;

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api/v1", api_routes.with_state(state))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(cors_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// Connect the configured store. PostgreSQL is migrated before use.
async fn setup_store(config: &Config) -> anyhow::Result<(Arc<dyn Store>, Option<PgPool>)> {
    match &config.database {
        DatabaseConfig::Postgres { url, pool } => {
            info!("Connecting to PostgreSQL");
            let pg_pool = PgPoolOptions::new()
                .max_connections(pool.max_connections)
                .min_connections(pool.min_connections)
                .acquire_timeout(pool.acquire_timeout)
                .idle_timeout(pool.idle_timeout)
                .connect(url)
                .await?;
            migrator().run(&pg_pool).await?;
            Ok((Arc::new(PostgresStore::new(pg_pool.clone())), Some(pg_pool)))
        }
        DatabaseConfig::Memory => {
            info!("Using the in-memory store; data is lost on restart");
            Ok((Arc::new(InMemoryStore::new()), None))
        }
    }
}

/// A configured server, ready to [`serve`](Application::serve).
pub struct Application {
    router: Router,
    config: Config,
    pool: Option<PgPool>,
}

impl Application {
    /// Connect the store, build the blob backend and the router
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!(bind = %config.bind_address(), database = ?config.database, "Starting filehub");

        let (store, pool) = setup_store(&config).await?;
        let file_storage = create_file_storage(&config.storage.backend, pool.as_ref())?;

        let state = AppState::builder()
            .config(config.clone())
            .store(store)
            .file_storage(file_storage)
            .build();
        let router = build_router(state)?;

        Ok(Self { router, config, pool })
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve_with_listener<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }

    /// Bind to the configured address and serve until `shutdown` resolves
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("filehub listening on http://{}, available at {}", bind_addr, self.config.public_base_url()?);

        self.serve_with_listener(listener, shutdown).await
    }
}
