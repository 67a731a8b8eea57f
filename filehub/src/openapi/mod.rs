//! OpenAPI documentation for `/api/v1/*`, served at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api;

/// Session tokens and the trusted proxy header.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Session token signed with the server's secret key:\n\n\
                            ```\nAuthorization: Bearer YOUR_SESSION_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
            components.security_schemes.insert(
                "ProxyIdentity".to_string(),
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "x-filehub-identity",
                    "Token identifier asserted by a trusted reverse proxy. Organizations may be listed in `x-filehub-orgs`.",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    servers(
        (url = "/api/v1", description = "File sharing API")
    ),
    modifiers(&SecurityAddon),
    paths(
        api::handlers::files::generate_upload_url,
        api::handlers::files::create_file,
        api::handlers::files::list_files,
        api::handlers::files::get_file_content,
        api::handlers::storage::upload,
        api::handlers::storage::delete_storage_object,
    ),
    components(
        schemas(
            api::models::files::FileCreate,
            api::models::files::FileResponse,
            api::models::storage::UploadUrlResponse,
            api::models::storage::UploadResponse,
        )
    ),
    tags(
        (name = "files", description = "Share files with an organization.

Uploading is two steps: request an upload URL, send the bytes to it, then create a file record with the returned `storageId` as `fileId`."),
        (name = "storage", description = "Single-use upload targets and cleanup of objects that never became files."),
    ),
    info(
        title = "filehub API",
        version = "1.0.0",
        description = "Organization-scoped file sharing.

## Errors

Failed requests carry a human-readable message as a plain-text body, for example `you must be logged in to upload a file`.",
    ),
)]
pub struct ApiDoc;
