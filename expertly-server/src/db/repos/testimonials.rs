//! Testimonial repository

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::DbError;
use crate::models::NewTestimonial;

/// Number of testimonials shown on the landing page
pub const LATEST_LIMIT: i64 = 5;

/// Testimonial record from database
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Testimonial {
    pub id: Uuid,
    pub rating: i32,
    pub user_name: String,
    pub user_image: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Testimonial repository
pub struct TestimonialRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> TestimonialRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn latest(&self) -> Result<Vec<Testimonial>, DbError> {
        let rows = sqlx::query_as::<_, Testimonial>(
            "SELECT * FROM testimonials ORDER BY created_at DESC, id LIMIT $1",
        )
        .bind(LATEST_LIMIT)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create(&self, new: NewTestimonial) -> Result<Testimonial, DbError> {
        let row = sqlx::query_as::<_, Testimonial>(
            r#"
            INSERT INTO testimonials (rating, user_name, user_image, message)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(new.rating)
        .bind(new.user_name)
        .bind(new.user_image)
        .bind(new.message)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "requires database"]
    async fn latest_returns_at_most_five(pool: PgPool) {
        let repo = TestimonialRepo::new(&pool);
        for i in 0..7 {
            let new = NewTestimonial::new(5, &format!("user {i}"), "https://cdn.example.com/a.png", "Helpful")
                .unwrap();
            repo.create(new).await.unwrap();
        }
        let latest = repo.latest().await.unwrap();
        assert_eq!(latest.len(), 5);
    }
}
