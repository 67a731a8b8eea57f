//! Request identity extraction.

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};
use uuid::Uuid;

use super::session;
use crate::{
    AppState,
    config::{AuthConfig, Config},
    db::{
        Store,
        models::users::{UserDBResponse, normalize_org_ids},
    },
    errors::{Error, Result},
    types::OrgId,
};

/// A caller as seen by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Stable identifier, unique per caller
    pub token_identifier: String,
    /// Set on read requests, which leave the store untouched
    #[serde(skip)]
    pub pending: Option<PendingSync>,
}

impl Identity {
    pub fn new(token_identifier: impl Into<String>) -> Self {
        Self {
            token_identifier: token_identifier.into(),
            pending: None,
        }
    }

    /// The user as a synced write request would see them, given the stored record
    pub fn effective_user(&self, stored: Option<UserDBResponse>) -> Option<UserDBResponse> {
        let Some(pending) = &self.pending else {
            return stored;
        };
        match stored {
            Some(mut user) => {
                if let Some(org_ids) = &pending.org_ids {
                    user.org_ids = org_ids.clone();
                }
                Some(user)
            }
            None if pending.create_user => Some(UserDBResponse {
                id: Uuid::nil(),
                token_identifier: self.token_identifier.clone(),
                org_ids: pending.org_ids.clone().unwrap_or_default(),
                created_at: Utc::now(),
            }),
            None => None,
        }
    }
}

/// The sync a write request would have performed for this caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSync {
    /// An unknown caller would get a user record
    pub create_user: bool,
    /// Memberships that would replace the stored ones
    pub org_ids: Option<Vec<OrgId>>,
}

/// The identity behind a request, or `None` for anonymous callers.
#[derive(Debug, Clone, Default)]
pub struct Caller(pub Option<Identity>);

impl Caller {
    pub fn identity(&self) -> Option<&Identity> {
        self.0.as_ref()
    }

    /// The identity, or `Unauthenticated` for operations that must not run anonymously
    pub fn require(&self) -> Result<&Identity> {
        self.0.as_ref().ok_or(Error::Unauthenticated { message: None })
    }
}

/// What an identity source asserted about the caller
#[derive(Debug)]
struct AssertedIdentity {
    identity: Identity,
    /// `None` when the source says nothing about organizations
    org_ids: Option<Vec<OrgId>>,
}

/// Extract an identity from a bearer session token
/// Returns:
/// - None: No bearer token present
/// - Some(Ok(identity)): Valid token
/// - Some(Err(error)): Token present but invalid or expired
#[instrument(skip(parts, config))]
fn try_session_auth(parts: &Parts, config: &Config) -> Option<Result<AssertedIdentity>> {
    let auth_header = parts.headers.get(axum::http::header::AUTHORIZATION)?;
    let auth_str = match auth_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid authorization header: {e}"),
            }));
        }
    };
    let token = auth_str.strip_prefix("Bearer ")?;

    Some(session::verify_session_token(token.trim(), config).map(|claims| AssertedIdentity {
        identity: claims.identity(),
        org_ids: claims.orgs.as_deref().map(normalize_org_ids::<String>),
    }))
}

/// Extract an identity asserted by a trusted proxy
/// Returns:
/// - None: Header absent or empty
/// - Some(Ok(identity)): Header present
/// - Some(Err(error)): Header is not valid UTF-8
#[instrument(skip(parts, config))]
fn try_proxy_header_auth(parts: &Parts, config: &AuthConfig) -> Option<Result<AssertedIdentity>> {
    let header = parts.headers.get(&config.proxy_header.header_name)?;
    let token_identifier = match header.to_str() {
        Ok(s) => s.trim(),
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid identity header: {e}"),
            }));
        }
    };
    if token_identifier.is_empty() {
        return None;
    }

    let org_ids = parts
        .headers
        .get(&config.proxy_header.orgs_header_name)
        .and_then(|h| h.to_str().ok())
        .map(|orgs| normalize_org_ids(&orgs.split(',').collect::<Vec<_>>()));

    Some(Ok(AssertedIdentity {
        identity: Identity::new(token_identifier),
        org_ids,
    }))
}

impl AssertedIdentity {
    /// Keep the assertion in memory instead of syncing it
    fn into_pending(self, config: &AuthConfig) -> Identity {
        Identity {
            pending: Some(PendingSync {
                create_user: config.auto_create_users,
                org_ids: self.org_ids.filter(|_| config.import_org_memberships),
            }),
            ..self.identity
        }
    }
}

/// Bring the stored user in line with what the identity source asserted
#[instrument(skip_all, fields(token_identifier = %asserted.identity.token_identifier), err)]
async fn sync_identity(store: &dyn Store, config: &AuthConfig, asserted: &AssertedIdentity) -> Result<()> {
    let token_identifier = &asserted.identity.token_identifier;
    let user = if config.auto_create_users {
        Some(store.get_or_create_user(token_identifier).await?)
    } else {
        store.get_user_by_token_identifier(token_identifier).await?
    };

    if let (Some(user), Some(org_ids), true) = (user, &asserted.org_ids, config.import_org_memberships)
        && &user.org_ids != org_ids
    {
        debug!("Syncing {} organization memberships", org_ids.len());
        store.replace_org_memberships(user.id, org_ids).await?;
    }

    Ok(())
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let auth = &state.config.auth;
        let mut asserted = None;

        if auth.session.enabled {
            match try_session_auth(parts, &state.config) {
                Some(Ok(found)) => asserted = Some(found),
                Some(Err(e)) => debug!("Session authentication failed: {e}"),
                None => trace!("No session token present"),
            }
        }

        if asserted.is_none() && auth.proxy_header.enabled {
            match try_proxy_header_auth(parts, auth) {
                Some(Ok(found)) => asserted = Some(found),
                Some(Err(e)) => debug!("Proxy header authentication failed: {e}"),
                None => trace!("No proxy identity header present"),
            }
        }

        match asserted {
            Some(asserted) if parts.method.is_safe() => Ok(Caller(Some(asserted.into_pending(auth)))),
            Some(asserted) => {
                sync_identity(state.store.as_ref(), auth, &asserted).await?;
                Ok(Caller(Some(asserted.identity)))
            }
            None => Ok(Caller(None)),
        }
    }
}
