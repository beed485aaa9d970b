//! Phone OTP sign-in and session endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{self, SignIn};
use crate::db::{Session, SessionRepo, User};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, ClientInfo, ValidJson};
use crate::http::server::AppState;
use crate::models::{OtpCode, PhoneNumber};

#[derive(Deserialize)]
pub struct SendOtpRequest {
    pub phone_number: String,
}

#[derive(Serialize)]
pub struct SendOtpResponse {
    pub success: bool,
    pub expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    pub phone_number: String,
    pub code: String,
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub session: Session,
    pub user: User,
}

#[derive(Serialize)]
pub struct SignOutResponse {
    pub success: bool,
}

/// POST /api/auth/phone/send-otp
async fn send_otp(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<SendOtpRequest>,
) -> Result<Json<SendOtpResponse>, ApiError> {
    let phone = PhoneNumber::new(&req.phone_number)?;
    let expires_at =
        auth::send_otp(&state.pool, &state.auth, state.otp_sender.as_ref(), &phone).await?;
    Ok(Json(SendOtpResponse {
        success: true,
        expires_at,
    }))
}

/// POST /api/auth/phone/verify
async fn verify(
    State(state): State<Arc<AppState>>,
    ClientInfo(client): ClientInfo,
    ValidJson(req): ValidJson<VerifyOtpRequest>,
) -> Result<Json<SignIn>, ApiError> {
    let phone = PhoneNumber::new(&req.phone_number)?;
    let code = OtpCode::new(&req.code)?;
    let name = req.name.as_deref().map(str::trim).filter(|n| !n.is_empty());

    let sign_in = auth::verify_otp(&state.pool, &state.auth, &phone, &code, name, client).await?;
    Ok(Json(sign_in))
}

/// GET /api/auth/session
async fn session(auth: AuthUser) -> Json<SessionResponse> {
    Json(SessionResponse {
        session: auth.session,
        user: auth.user,
    })
}

/// POST /api/auth/sign-out
async fn sign_out(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<SignOutResponse>, ApiError> {
    SessionRepo::new(&state.pool).delete(auth.session.id).await?;
    tracing::info!(user = %auth.user.id, "signed out");
    Ok(Json(SignOutResponse { success: true }))
}

/// Auth routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/phone/send-otp", post(send_otp))
        .route("/api/auth/phone/verify", post(verify))
        .route("/api/auth/session", get(session))
        .route("/api/auth/sign-out", post(sign_out))
}
