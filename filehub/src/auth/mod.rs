//! Identity and organization access.
//!
//! # Identity
//!
//! [`identity::Caller`] resolves who made a request, trying in order:
//!
//! 1. **Session tokens**: `Authorization: Bearer <jwt>` signed with `secret_key`
//!    ([`session`]). The `sub` claim is the token identifier.
//! 2. **Proxy header**: a trusted reverse proxy asserts the token identifier in
//!    `x-filehub-identity` (configurable), and optionally organizations in `x-filehub-orgs`.
//!
//! Missing or invalid credentials make the caller anonymous; they are never an error by
//! themselves. Each operation decides whether anonymity is a hard failure.
//!
//! # Access
//!
//! [`access::has_access_to_org`] decides whether a caller may act on an organization's files.
//!
//! # Upload tokens
//!
//! [`upload_token`] signs the single-use capability embedded in upload URLs.

use crate::{
    config::Config,
    errors::{Error, Result},
};

pub mod access;
pub mod identity;
pub mod session;
pub mod upload_token;

/// The key used to sign and verify every token this service issues
fn signing_secret(config: &Config) -> Result<&[u8]> {
    config
        .secret_key
        .as_deref()
        .filter(|key| !key.is_empty())
        .map(str::as_bytes)
        .ok_or_else(|| Error::Internal {
            operation: "sign tokens: secret_key is required".to_string(),
        })
}

/// Client errors (malformed, expired, wrong audience) become `Unauthenticated` with the given
/// message; key and encoding failures are internal.
fn classify_token_error(e: jsonwebtoken::errors::Error, message: Option<&str>) -> Error {
    use jsonwebtoken::errors::ErrorKind;

    match e.kind() {
        ErrorKind::InvalidToken
        | ErrorKind::InvalidSignature
        | ErrorKind::ExpiredSignature
        | ErrorKind::MissingRequiredClaim(_)
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidAudience
        | ErrorKind::InvalidSubject
        | ErrorKind::ImmatureSignature
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_)
        | ErrorKind::InvalidAlgorithm => Error::Unauthenticated {
            message: message.map(str::to_string),
        },
        _ => Error::Internal {
            operation: format!("JWT verification: {e}"),
        },
    }
}
