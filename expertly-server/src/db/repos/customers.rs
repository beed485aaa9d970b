//! Customer repository

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::users::{UserSummary, USER_SUMMARY_JSON};
use super::DbError;
use crate::models::{CustomerProfile, Gender, Pagination};

/// Customer record from database
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub exam_preferences: Vec<String>,
    pub interest_preferences: Vec<String>,
    pub account_status: String,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Customer with user summary for admin listings
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CustomerWithUser {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub customer: Customer,
    pub user: Json<UserSummary>,
}

/// Customer repository
pub struct CustomerRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_user(&self, user_id: Uuid) -> Result<Customer, DbError> {
        sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", user_id))
    }

    /// Create the caller's profile or replace its editable fields.
    pub async fn upsert(&self, user_id: Uuid, profile: CustomerProfile) -> Result<Customer, DbError> {
        let interests = profile.interest_labels();
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (user_id, gender, address, exam_preferences, interest_preferences)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE SET
                gender = EXCLUDED.gender,
                address = EXCLUDED.address,
                exam_preferences = EXCLUDED.exam_preferences,
                interest_preferences = EXCLUDED.interest_preferences,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(profile.gender)
        .bind(profile.address)
        .bind(profile.exam_preferences)
        .bind(interests)
        .fetch_one(self.pool)
        .await?;
        Ok(customer)
    }

    pub async fn list(&self, page: Pagination) -> Result<(Vec<CustomerWithUser>, i64), DbError> {
        let sql = format!(
            r#"
            SELECT c.*, {USER_SUMMARY_JSON} AS "user"
            FROM customers c
            JOIN users u ON u.id = c.user_id
            ORDER BY c.created_at DESC, c.id
            LIMIT $1 OFFSET $2
            "#
        );
        let items = sqlx::query_as::<_, CustomerWithUser>(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM customers")
            .fetch_one(self.pool)
            .await?;
        Ok((items, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::UserRepo;
    use crate::models::{Interest, PhoneNumber};

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "requires database"]
    async fn upsert_replaces_preferences(pool: PgPool) {
        let user = UserRepo::new(&pool)
            .upsert_verified_phone(&PhoneNumber::new("9876543210").unwrap(), None)
            .await
            .unwrap();
        let repo = CustomerRepo::new(&pool);
        assert!(matches!(repo.get_by_user(user.id).await, Err(DbError::NotFound { .. })));

        let first = repo
            .upsert(
                user.id,
                CustomerProfile {
                    interest_preferences: vec![Interest::Music],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let second = repo
            .upsert(
                user.id,
                CustomerProfile {
                    gender: Some(Gender::Male),
                    interest_preferences: vec![Interest::Sports],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.interest_preferences, vec!["sports"]);

        let (page, total) = repo.list(Pagination::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].user.0.id, user.id);
    }
}
