//! One-time code repository
//!
//! One live code per phone number. Issuing a new code replaces the old
//! one and resets its attempt counter.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::DbError;
use crate::models::PhoneNumber;

/// Stored one-time code
#[derive(Debug, Clone, FromRow)]
pub struct OtpRecord {
    pub phone_number: String,
    pub code_hash: String,
    pub attempts: i32,
    pub expires_at: DateTime<Utc>,
}

/// One-time code repository
pub struct OtpRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> OtpRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn replace(
        &self,
        phone: &PhoneNumber,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO otp_codes (phone_number, code_hash, attempts, expires_at)
            VALUES ($1, $2, 0, $3)
            ON CONFLICT (phone_number) DO UPDATE
                SET code_hash = EXCLUDED.code_hash,
                    attempts = 0,
                    expires_at = EXCLUDED.expires_at,
                    created_at = NOW()
            "#,
        )
        .bind(phone.as_str())
        .bind(code_hash)
        .bind(expires_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// The unexpired code for `phone`, if any.
    pub async fn find_live(&self, phone: &PhoneNumber) -> Result<Option<OtpRecord>, DbError> {
        let record = sqlx::query_as::<_, OtpRecord>(
            r#"
            SELECT phone_number, code_hash, attempts, expires_at
            FROM otp_codes
            WHERE phone_number = $1 AND expires_at > NOW()
            "#,
        )
        .bind(phone.as_str())
        .fetch_optional(self.pool)
        .await?;
        Ok(record)
    }

    /// Take one attempt against the live code for `phone`.
    ///
    /// The counter is incremented in the same statement that checks it, so
    /// concurrent verifications cannot compare more than `max_attempts`
    /// guesses against one code.
    pub async fn claim_attempt(
        &self,
        phone: &PhoneNumber,
        max_attempts: i32,
    ) -> Result<AttemptClaim, DbError> {
        let claimed: Option<(String, i32)> = sqlx::query_as(
            r#"
            UPDATE otp_codes SET attempts = attempts + 1
            WHERE phone_number = $1 AND expires_at > NOW() AND attempts < $2
            RETURNING code_hash, attempts
            "#,
        )
        .bind(phone.as_str())
        .bind(max_attempts)
        .fetch_optional(self.pool)
        .await?;

        Ok(match claimed {
            Some((code_hash, attempts)) => AttemptClaim::Claimed { code_hash, attempts },
            None if self.find_live(phone).await?.is_some() => AttemptClaim::Exhausted,
            None => AttemptClaim::Missing,
        })
    }

    /// Delete the code if it is still the one that was checked.
    ///
    /// Returns false when another request consumed or replaced it first.
    pub async fn consume(&self, phone: &PhoneNumber, code_hash: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM otp_codes WHERE phone_number = $1 AND code_hash = $2")
            .bind(phone.as_str())
            .bind(code_hash)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

/// Outcome of [`OtpRepo::claim_attempt`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptClaim {
    /// Attempt counted; compare against `code_hash`
    Claimed { code_hash: String, attempts: i32 },
    /// A live code exists but its attempts are used up
    Exhausted,
    /// No unexpired code for this number
    Missing,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "requires database"]
    async fn replace_resets_attempts(pool: PgPool) {
        let repo = OtpRepo::new(&pool);
        let phone = PhoneNumber::new("+919876543210").unwrap();
        let expiry = Utc::now() + Duration::minutes(5);

        repo.replace(&phone, "a", expiry).await.unwrap();
        for expected in 1..=2 {
            let claim = repo.claim_attempt(&phone, 3).await.unwrap();
            assert_eq!(
                claim,
                AttemptClaim::Claimed {
                    code_hash: "a".into(),
                    attempts: expected
                }
            );
        }

        repo.replace(&phone, "b", expiry).await.unwrap();
        let live = repo.find_live(&phone).await.unwrap().unwrap();
        assert_eq!(live.attempts, 0);
        assert_eq!(live.code_hash, "b");

        assert!(!repo.consume(&phone, "a").await.unwrap());
        assert!(repo.consume(&phone, "b").await.unwrap());
        assert!(repo.find_live(&phone).await.unwrap().is_none());
        assert_eq!(repo.claim_attempt(&phone, 3).await.unwrap(), AttemptClaim::Missing);
    }

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "requires database"]
    async fn claims_stop_at_the_limit(pool: PgPool) {
        let repo = OtpRepo::new(&pool);
        let phone = PhoneNumber::new("9876543210").unwrap();
        repo.replace(&phone, "a", Utc::now() + Duration::minutes(5))
            .await
            .unwrap();

        for _ in 0..3 {
            assert!(matches!(
                repo.claim_attempt(&phone, 3).await.unwrap(),
                AttemptClaim::Claimed { .. }
            ));
        }
        assert_eq!(repo.claim_attempt(&phone, 3).await.unwrap(), AttemptClaim::Exhausted);
        assert_eq!(repo.find_live(&phone).await.unwrap().unwrap().attempts, 3);
    }

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "requires database"]
    async fn expired_codes_are_not_live(pool: PgPool) {
        let repo = OtpRepo::new(&pool);
        let phone = PhoneNumber::new("9876543210").unwrap();
        repo.replace(&phone, "a", Utc::now() - Duration::seconds(1))
            .await
            .unwrap();
        assert!(repo.find_live(&phone).await.unwrap().is_none());
    }
}
