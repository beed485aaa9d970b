//! Session repository
//!
//! Only the SHA-256 hash of a bearer token is stored; lookups hash the
//! presented token first.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{DbError, User};

/// Session record from database
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Client details recorded alongside a new session
#[derive(Debug, Clone, Default)]
pub struct SessionClient {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

/// Session repository
pub struct SessionRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> SessionRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
        client: SessionClient,
    ) -> Result<Session, DbError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (user_id, token_hash, expires_at, user_agent, ip_address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .bind(client.user_agent)
        .bind(client.ip_address)
        .fetch_one(self.pool)
        .await?;
        Ok(session)
    }

    /// Look up an unexpired session and its user.
    pub async fn find_active(&self, token_hash: &str) -> Result<Option<(Session, User)>, DbError> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE token_hash = $1 AND expires_at > NOW()",
        )
        .bind(token_hash)
        .fetch_optional(self.pool)
        .await?;

        let Some(session) = session else {
            return Ok(None);
        };

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(session.user_id)
            .fetch_optional(self.pool)
            .await?;

        Ok(user.map(|user| (session, user)))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Session", id));
        }
        Ok(())
    }

    /// Remove expired sessions, returning how many were deleted.
    pub async fn purge_expired(&self) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::UserRepo;
    use crate::models::PhoneNumber;
    use chrono::Duration;

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "requires database"]
    async fn expired_sessions_are_not_found(pool: PgPool) {
        let phone = PhoneNumber::new("9123456789").unwrap();
        let user = UserRepo::new(&pool)
            .upsert_verified_phone(&phone, None)
            .await
            .unwrap();
        let repo = SessionRepo::new(&pool);

        repo.create(user.id, "live", Utc::now() + Duration::hours(1), SessionClient::default())
            .await
            .unwrap();
        repo.create(user.id, "stale", Utc::now() - Duration::hours(1), SessionClient::default())
            .await
            .unwrap();

        let (session, found) = repo.find_active("live").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(repo.find_active("stale").await.unwrap().is_none());

        assert_eq!(repo.purge_expired().await.unwrap(), 1);
        repo.delete(session.id).await.unwrap();
        assert!(repo.find_active("live").await.unwrap().is_none());
    }
}
