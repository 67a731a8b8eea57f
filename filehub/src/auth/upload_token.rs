//! Signed, expiring capabilities for a single binary upload.
//!
//! Minting needs no database: the upload id travels inside the token and is only recorded when
//! the upload completes, where a unique constraint turns any replay into a conflict.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use super::{classify_token_error, identity::Identity, signing_secret};
use crate::{
    config::Config,
    errors::{Error, Result},
    types::UploadId,
};

/// Audience claim distinguishing upload tokens from session tokens
pub const UPLOAD_AUDIENCE: &str = "filehub-upload";

/// Path under the public URL that accepts uploads, followed by the token
pub const UPLOAD_PATH: [&str; 4] = ["api", "v1", "storage", "upload"];

const INVALID_UPLOAD_URL: &str = "This upload URL is invalid or has expired";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadClaims {
    /// Unique per minted URL
    pub jti: UploadId,
    /// Token identifier of the caller the URL was minted for
    pub sub: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

/// Mint an upload URL for `identity` under the configured public URL
pub fn mint_upload_url(identity: &Identity, config: &Config) -> Result<Url> {
    let iat = Utc::now().timestamp();
    let ttl = i64::try_from(config.storage.upload_url_ttl.as_secs()).unwrap_or(i64::MAX);
    let claims = UploadClaims {
        jti: Uuid::new_v4(),
        sub: identity.token_identifier.clone(),
        aud: UPLOAD_AUDIENCE.to_string(),
        exp: iat.saturating_add(ttl),
        iat,
    };

    let key = EncodingKey::from_secret(signing_secret(config)?);
    let token = encode(&Header::default(), &claims, &key).map_err(|e| Error::Internal {
        operation: format!("create upload token: {e}"),
    })?;

    let mut url = config.public_base_url()?;
    url.path_segments_mut()
        .map_err(|_| Error::Internal {
            operation: "build upload URL: public_url cannot be a base".to_string(),
        })?
        .pop_if_empty()
        .extend(UPLOAD_PATH)
        .push(&token);

    Ok(url)
}

/// Verify an upload token taken from an upload URL
pub fn verify_upload_token(token: &str, config: &Config) -> Result<UploadClaims> {
    let key = DecodingKey::from_secret(signing_secret(config)?);
    let mut validation = Validation::default();
    validation.set_audience(&[UPLOAD_AUDIENCE]);
    // The URL's lifetime is exactly the configured TTL
    validation.leeway = 0;

    let token_data = decode::<UploadClaims>(token, &key, &validation).map_err(|e| classify_token_error(e, Some(INVALID_UPLOAD_URL)))?;
    Ok(token_data.claims)
}
