//! Database repository for users and their organization memberships.

use chrono::{DateTime, Utc};
use sqlx::{Connection, FromRow, PgConnection};
use tracing::instrument;
use uuid::Uuid;

use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::users::{UserCreateDBRequest, UserDBResponse},
};
use crate::types::{OrgId, UserId, abbrev_uuid};

#[derive(Debug, Clone, FromRow)]
struct User {
    id: UserId,
    token_identifier: String,
    created_at: DateTime<Utc>,
}

impl From<(User, Vec<OrgId>)> for UserDBResponse {
    fn from((user, org_ids): (User, Vec<OrgId>)) -> Self {
        Self {
            id: user.id,
            token_identifier: user.token_identifier,
            org_ids,
            created_at: user.created_at,
        }
    }
}

pub struct Users<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    async fn org_ids(&mut self, user_id: UserId) -> Result<Vec<OrgId>> {
        let org_ids = sqlx::query_scalar::<_, OrgId>("SELECT org_id FROM user_organizations WHERE user_id = $1 ORDER BY position")
            .bind(user_id)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(org_ids)
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_token_identifier(&mut self, token_identifier: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, User>("SELECT id, token_identifier, created_at FROM users WHERE token_identifier = $1")
            .bind(token_identifier)
            .fetch_optional(&mut *self.db)
            .await?;

        match user {
            Some(user) => {
                let org_ids = self.org_ids(user.id).await?;
                Ok(Some(UserDBResponse::from((user, org_ids))))
            }
            None => Ok(None),
        }
    }

    /// Fetch the user for a token identifier, creating it on first sight.
    #[instrument(skip(self, request), err)]
    pub async fn get_or_create(&mut self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        sqlx::query("INSERT INTO users (id, token_identifier) VALUES ($1, $2) ON CONFLICT (token_identifier) DO NOTHING")
            .bind(Uuid::new_v4())
            .bind(&request.token_identifier)
            .execute(&mut *self.db)
            .await?;

        self.get_by_token_identifier(&request.token_identifier)
            .await?
            .ok_or(crate::db::errors::DbError::NotFound)
    }

    /// Replace the user's memberships with `org_ids`, preserving their order.
    #[instrument(skip(self, org_ids), fields(user_id = %abbrev_uuid(&user_id), count = org_ids.len()), err)]
    pub async fn replace_org_memberships(&mut self, user_id: UserId, org_ids: &[OrgId]) -> Result<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM user_organizations WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for (position, org_id) in org_ids.iter().enumerate() {
            sqlx::query("INSERT INTO user_organizations (user_id, org_id, position) VALUES ($1, $2, $3)")
                .bind(user_id)
                .bind(org_id)
                .bind(position as i32)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Users<'c> {
    type CreateRequest = UserCreateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;

    #[instrument(skip(self, request), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, token_identifier) VALUES ($1, $2) RETURNING id, token_identifier, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&request.token_identifier)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(UserDBResponse::from((user, Vec::new())))
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let user = sqlx::query_as::<_, User>("SELECT id, token_identifier, created_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        match user {
            Some(user) => {
                let org_ids = self.org_ids(user.id).await?;
                Ok(Some(UserDBResponse::from((user, org_ids))))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::errors::DbError;
    use sqlx::PgPool;

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
    async fn test_get_or_create_is_idempotent(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);
        let request = UserCreateDBRequest {
            token_identifier: "https://issuer.example|user_42".to_string(),
        };

        let first = repo.get_or_create(&request).await.unwrap();
        let second = repo.get_or_create(&request).await.unwrap();

        assert_eq!(first.id, second.id);
        assert!(first.org_ids.is_empty());
        assert_eq!(repo.get_by_id(first.id).await.unwrap(), Some(first));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
    async fn test_replace_org_memberships_keeps_order(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);
        let user = repo
            .create(&UserCreateDBRequest {
                token_identifier: "user_A".to_string(),
            })
            .await
            .unwrap();

        repo.replace_org_memberships(user.id, &["org_9".to_string(), "org_1".to_string()])
            .await
            .unwrap();
        let loaded = repo.get_by_token_identifier("user_A").await.unwrap().unwrap();
        assert_eq!(loaded.org_ids, vec!["org_9", "org_1"]);

        repo.replace_org_memberships(user.id, &["org_2".to_string()]).await.unwrap();
        let loaded = repo.get_by_token_identifier("user_A").await.unwrap().unwrap();
        assert_eq!(loaded.org_ids, vec!["org_2"]);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
    async fn test_duplicate_token_identifier_is_unique_violation(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);
        let request = UserCreateDBRequest {
            token_identifier: "user_B".to_string(),
        };

        repo.create(&request).await.unwrap();
        let err = repo.create(&request).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
