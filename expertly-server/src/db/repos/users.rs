//! User repository
//!
//! Users are keyed by their verified phone number. Sign-in creates the
//! row on first verification and reuses it afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::DbError;
use crate::models::{PhoneNumber, Role};

/// User record from database
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone_number: String,
    pub phone_number_verified: bool,
    pub image: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public subset of a user embedded in expert and customer listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone_number: String,
    pub image: Option<String>,
}

/// SQL expression building a [`UserSummary`] object from alias `u`.
pub(crate) const USER_SUMMARY_JSON: &str = "json_build_object('id', u.id, 'name', u.name, \
     'email', u.email, 'phone_number', u.phone_number, 'image', u.image)";

/// User repository
pub struct UserRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: Uuid) -> Result<User, DbError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Find the user for a freshly verified phone number, creating it if
    /// needed. `name` is only used for new rows.
    pub async fn upsert_verified_phone(
        &self,
        phone: &PhoneNumber,
        name: Option<&str>,
    ) -> Result<User, DbError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (phone_number, phone_number_verified, name)
            VALUES ($1, TRUE, COALESCE($2, ''))
            ON CONFLICT (phone_number) DO UPDATE
                SET phone_number_verified = TRUE, updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(phone.as_str())
        .bind(name)
        .fetch_one(self.pool)
        .await?;
        Ok(user)
    }

    /// Change a user's role, identified by phone number.
    pub async fn set_role(&self, phone: &PhoneNumber, role: Role) -> Result<User, DbError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET role = $2, updated_at = NOW()
            WHERE phone_number = $1
            RETURNING *
            "#,
        )
        .bind(phone.as_str())
        .bind(role)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("User", phone.as_str()))
    }
}
