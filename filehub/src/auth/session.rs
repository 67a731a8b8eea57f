//! JWT session token creation and verification.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::{classify_token_error, identity::Identity, signing_secret};
use crate::{
    config::Config,
    errors::{Error, Result},
    types::OrgId,
};

/// Audience claim distinguishing session tokens from upload tokens
pub const SESSION_AUDIENCE: &str = "filehub-session";

/// JWT session claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // Token identifier
    /// Organizations asserted by the issuer, imported as memberships when enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orgs: Option<Vec<OrgId>>,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

impl SessionClaims {
    pub fn new(identity: &Identity, orgs: Option<Vec<OrgId>>, config: &Config) -> Self {
        let iat = Utc::now().timestamp();
        let ttl = i64::try_from(config.auth.security.jwt_expiry.as_secs()).unwrap_or(i64::MAX);

        Self {
            sub: identity.token_identifier.clone(),
            orgs,
            aud: SESSION_AUDIENCE.to_string(),
            exp: iat.saturating_add(ttl),
            iat,
        }
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.sub.clone())
    }
}

/// Create a session token for an identity
pub fn create_session_token(identity: &Identity, orgs: Option<Vec<OrgId>>, config: &Config) -> Result<String> {
    let claims = SessionClaims::new(identity, orgs, config);
    let key = EncodingKey::from_secret(signing_secret(config)?);
    encode(&Header::default(), &claims, &key).map_err(|e| Error::Internal {
        operation: format!("create JWT: {e}"),
    })
}

/// Verify and decode a session token
pub fn verify_session_token(token: &str, config: &Config) -> Result<SessionClaims> {
    let key = DecodingKey::from_secret(signing_secret(config)?);
    let mut validation = Validation::default();
    validation.set_audience(&[SESSION_AUDIENCE]);

    let token_data = decode::<SessionClaims>(token, &key, &validation).map_err(|e| classify_token_error(e, None))?;
    Ok(token_data.claims)
}
