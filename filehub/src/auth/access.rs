//! Organization access check.
//!
//! A caller may act on an organization's files when they are a member of it, or when the
//! organization is their personal one. Personal organizations have no record of their own: a
//! user's id is used as the organization id, and [`PersonalOrgMatch`] decides how strictly that
//! id is compared with the caller's token identifier.

use tracing::{debug, instrument};

use super::identity::Identity;
use crate::{config::PersonalOrgMatch, db::Store, db::models::users::UserDBResponse, errors::Result};

/// Why access was granted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessGrant {
    Membership,
    PersonalOrganization,
}

/// Outcome of an access check. Callers decide whether `Denied` means an empty result or an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrgAccess {
    Granted { user: UserDBResponse, via: AccessGrant },
    Denied,
}

impl OrgAccess {
    /// Decide access for a known user
    pub fn evaluate(user: UserDBResponse, org_id: &str, mode: PersonalOrgMatch) -> Self {
        if org_id.is_empty() {
            OrgAccess::Denied
        } else if user.is_member_of(org_id) {
            OrgAccess::Granted {
                user,
                via: AccessGrant::Membership,
            }
        } else if user.personal_org_matches(org_id, mode) {
            OrgAccess::Granted {
                user,
                via: AccessGrant::PersonalOrganization,
            }
        } else {
            OrgAccess::Denied
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, OrgAccess::Granted { .. })
    }
}

/// Whether `caller` may act on `org_id`.
///
/// Anonymous callers, callers without a user record and empty organization ids are `Denied`.
/// Only store failures are errors.
#[instrument(skip(store, caller), fields(caller = caller.map(|c| c.token_identifier.as_str())), err)]
pub async fn has_access_to_org(store: &dyn Store, caller: Option<&Identity>, org_id: &str, mode: PersonalOrgMatch) -> Result<OrgAccess> {
    let Some(identity) = caller else {
        return Ok(OrgAccess::Denied);
    };
    if org_id.is_empty() {
        return Ok(OrgAccess::Denied);
    }

    let stored = store.get_user_by_token_identifier(&identity.token_identifier).await?;
    let Some(user) = identity.effective_user(stored) else {
        debug!("No user record for caller");
        return Ok(OrgAccess::Denied);
    };

    let access = OrgAccess::evaluate(user, org_id, mode);
    if let OrgAccess::Granted { via, .. } = &access {
        debug!(?via, "Organization access granted");
    }
    Ok(access)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;

    /// Users as `(token identifier, comma-separated memberships)`
    async fn store_with(users: &[(&str, &str)]) -> InMemoryStore {
        let store = InMemoryStore::new();
        for (token_identifier, org_ids) in users {
            let user = store.get_or_create_user(token_identifier).await.unwrap();
            let org_ids: Vec<String> = org_ids.split(',').filter(|s| !s.is_empty()).map(str::to_string).collect();
            store.replace_org_memberships(user.id, &org_ids).await.unwrap();
        }
        store
    }

    async fn check(store: &InMemoryStore, caller: Option<&str>, org_id: &str) -> OrgAccess {
        let identity = caller.map(Identity::new);
        has_access_to_org(store, identity.as_ref(), org_id, PersonalOrgMatch::Substring)
            .await
            .unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn test_anonymous_caller_is_denied() {
        let store = store_with(&[]).await;
        assert_eq!(check(&store, None, "org_9").await, OrgAccess::Denied);
    }

    #[test_log::test(tokio::test)]
    async fn test_unknown_user_is_denied() {
        let store = store_with(&[]).await;
        assert_eq!(check(&store, Some("user_42"), "user_42").await, OrgAccess::Denied);
    }

    #[test_log::test(tokio::test)]
    async fn test_member_is_granted() {
        let store = store_with(&[("user_A", "org_9")]).await;
        match check(&store, Some("user_A"), "org_9").await {
            OrgAccess::Granted { user, via } => {
                assert_eq!(user.token_identifier, "user_A");
                assert_eq!(via, AccessGrant::Membership);
            }
            OrgAccess::Denied => panic!("member should have access"),
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_personal_organization_is_granted() {
        let store = store_with(&[("user_42", "")]).await;
        match check(&store, Some("user_42"), "user_42").await {
            OrgAccess::Granted { via, .. } => assert_eq!(via, AccessGrant::PersonalOrganization),
            OrgAccess::Denied => panic!("personal organization should be accessible"),
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_non_member_is_denied() {
        let store = store_with(&[("user_A", "org_9"), ("user_B", "")]).await;
        assert_eq!(check(&store, Some("user_B"), "org_9").await, OrgAccess::Denied);
    }

    #[test_log::test(tokio::test)]
    async fn test_substring_of_identity_is_granted() {
        // Any fragment of the token identifier counts as the personal organization
        let store = store_with(&[("https://issuer.example|user_42", "")]).await;
        assert!(check(&store, Some("https://issuer.example|user_42"), "issuer").await.is_granted());
        assert!(check(&store, Some("https://issuer.example|user_42"), "2").await.is_granted());
        assert!(!check(&store, Some("https://issuer.example|user_42"), "user_43").await.is_granted());
    }

    #[test_log::test(tokio::test)]
    async fn test_exact_mode_only_grants_personal_org() {
        let store = store_with(&[("https://issuer.example|user_42", "")]).await;
        let identity = Identity::new("https://issuer.example|user_42");

        let exact = |org_id: &'static str| has_access_to_org(&store, Some(&identity), org_id, PersonalOrgMatch::Exact);
        assert!(exact("user_42").await.unwrap().is_granted());
        assert!(!exact("issuer").await.unwrap().is_granted());
    }

    #[test_log::test(tokio::test)]
    async fn test_empty_org_id_is_denied() {
        let store = store_with(&[("user_42", "")]).await;
        assert_eq!(check(&store, Some("user_42"), "").await, OrgAccess::Denied);
    }
}
