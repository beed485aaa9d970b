//! Phone sign-in flow and session lookup

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;

use super::sender::{OtpSender, SendError};
use super::token::{generate_otp, generate_session_token, hash_secret};
use crate::db::{AttemptClaim, DbError, OtpRepo, Session, SessionClient, SessionRepo, User, UserRepo};
use crate::models::{OtpCode, PhoneNumber};
use expertly_core::AuthConfig;

/// Sign-in error
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("OTP expired or not found")]
    OtpNotFound,

    #[error("Too many attempts")]
    TooManyAttempts,

    #[error("Invalid OTP")]
    InvalidOtp,

    #[error("failed to send OTP: {0}")]
    Send(#[from] SendError),

    #[error(transparent)]
    Db(#[from] DbError),
}

/// Session and code lifetimes
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub session_ttl: Duration,
    pub otp_ttl: Duration,
    pub otp_max_attempts: i32,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

impl From<&AuthConfig> for AuthSettings {
    fn from(config: &AuthConfig) -> Self {
        Self {
            session_ttl: Duration::hours(config.session_ttl_hours),
            otp_ttl: Duration::seconds(config.otp_ttl_seconds),
            otp_max_attempts: config.otp_max_attempts,
        }
    }
}

/// Result of a successful verification
#[derive(Debug, Clone, Serialize)]
pub struct SignIn {
    /// Raw bearer token; shown once, stored only as a hash
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// Issue a fresh code for `phone` and hand it to `sender`.
///
/// Returns when the code expires.
pub async fn send_otp(
    pool: &PgPool,
    settings: &AuthSettings,
    sender: &dyn OtpSender,
    phone: &PhoneNumber,
) -> Result<DateTime<Utc>, AuthError> {
    let code = generate_otp();
    let expires_at = Utc::now() + settings.otp_ttl;
    OtpRepo::new(pool)
        .replace(phone, &hash_secret(&code), expires_at)
        .await?;

    sender.send(phone, &code).await?;
    tracing::info!(sender = sender.name(), "one-time code issued");
    Ok(expires_at)
}

/// Check `code` for `phone` and open a session on success.
///
/// Each call claims one attempt before the code is compared, so a
/// locked-out number stays locked even when the right code arrives, and
/// parallel guesses share the same limit.
pub async fn verify_otp(
    pool: &PgPool,
    settings: &AuthSettings,
    phone: &PhoneNumber,
    code: &OtpCode,
    name: Option<&str>,
    client: SessionClient,
) -> Result<SignIn, AuthError> {
    let otps = OtpRepo::new(pool);
    let (code_hash, attempts) = match otps.claim_attempt(phone, settings.otp_max_attempts).await? {
        AttemptClaim::Claimed { code_hash, attempts } => (code_hash, attempts),
        AttemptClaim::Exhausted => return Err(AuthError::TooManyAttempts),
        AttemptClaim::Missing => return Err(AuthError::OtpNotFound),
    };
    if hash_secret(code.as_str()) != code_hash {
        tracing::debug!(attempts, "invalid one-time code");
        return Err(AuthError::InvalidOtp);
    }
    if !otps.consume(phone, &code_hash).await? {
        return Err(AuthError::OtpNotFound);
    }

    let user = UserRepo::new(pool).upsert_verified_phone(phone, name).await?;
    let token = generate_session_token();
    let expires_at = Utc::now() + settings.session_ttl;
    SessionRepo::new(pool)
        .create(user.id, &hash_secret(&token), expires_at, client)
        .await?;

    tracing::info!(user = %user.id, "signed in");
    Ok(SignIn {
        token,
        expires_at,
        user,
    })
}

/// Resolve a bearer token to its live session.
pub async fn authenticate(pool: &PgPool, token: &str) -> Result<Option<(Session, User)>, DbError> {
    SessionRepo::new(pool).find_active(&hash_secret(token)).await
}
