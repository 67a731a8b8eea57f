use chrono::{DateTime, Utc};

use crate::config::PersonalOrgMatch;
use crate::types::{OrgId, UserId};

/// Database request for creating a user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub token_identifier: String,
}

/// Database response for a user, with memberships in the order they were asserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDBResponse {
    pub id: UserId,
    pub token_identifier: String,
    pub org_ids: Vec<OrgId>,
    pub created_at: DateTime<Utc>,
}

impl UserDBResponse {
    pub fn is_member_of(&self, org_id: &str) -> bool {
        self.org_ids.iter().any(|id| id == org_id)
    }

    /// The id of the user's personal organization.
    ///
    /// Identity providers issue token identifiers of the form `{issuer}|{subject}`; the subject
    /// is the user id clients fall back to when no organization is selected.
    pub fn personal_org_id(&self) -> &str {
        self.token_identifier
            .rsplit_once('|')
            .map_or(self.token_identifier.as_str(), |(_, subject)| subject)
    }

    /// Whether `org_id` names this user's personal organization.
    ///
    /// In `Substring` mode any org id contained in the token identifier matches, so short ids
    /// such as `"1"` can match identifiers they were never issued for.
    pub fn personal_org_matches(&self, org_id: &str, mode: PersonalOrgMatch) -> bool {
        match mode {
            PersonalOrgMatch::Substring => self.token_identifier.contains(org_id),
            PersonalOrgMatch::Exact => self.personal_org_id() == org_id,
        }
    }
}

/// Trim, drop empty ids and remove duplicates, keeping first-seen order.
pub fn normalize_org_ids<S: AsRef<str>>(org_ids: &[S]) -> Vec<OrgId> {
    let mut normalized: Vec<OrgId> = Vec::with_capacity(org_ids.len());
    for org_id in org_ids.iter().map(|s| s.as_ref().trim()) {
        if !org_id.is_empty() && !normalized.iter().any(|seen| seen == org_id) {
            normalized.push(org_id.to_string());
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(token_identifier: &str, org_ids: &[&str]) -> UserDBResponse {
        UserDBResponse {
            id: Uuid::new_v4(),
            token_identifier: token_identifier.to_string(),
            org_ids: org_ids.iter().map(|s| s.to_string()).collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_personal_org_id() {
        assert_eq!(user("https://issuer.example|user_42", &[]).personal_org_id(), "user_42");
        assert_eq!(user("user_42", &[]).personal_org_id(), "user_42");
    }

    #[test]
    fn test_substring_mode_matches_any_fragment() {
        let u = user("https://issuer.example|user_42", &[]);
        assert!(u.personal_org_matches("user_42", PersonalOrgMatch::Substring));
        assert!(u.personal_org_matches("issuer", PersonalOrgMatch::Substring));
        assert!(u.personal_org_matches("4", PersonalOrgMatch::Substring));
        assert!(!u.personal_org_matches("user_43", PersonalOrgMatch::Substring));
    }

    #[test]
    fn test_exact_mode_matches_only_personal_org() {
        let u = user("https://issuer.example|user_42", &[]);
        assert!(u.personal_org_matches("user_42", PersonalOrgMatch::Exact));
        assert!(!u.personal_org_matches("issuer", PersonalOrgMatch::Exact));
        assert!(!u.personal_org_matches("4", PersonalOrgMatch::Exact));
    }

    #[test]
    fn test_normalize_org_ids() {
        assert_eq!(normalize_org_ids(&[" org_2", "org_1", "", "org_2 "]), vec!["org_2", "org_1"]);
    }

    #[test]
    fn test_membership() {
        let u = user("user_A", &["org_9", "org_1"]);
        assert!(u.is_member_of("org_9"));
        assert!(!u.is_member_of("org_"));
    }
}
