//! Health check and session echo

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::User;
use crate::http::extractors::AuthUser;
use crate::http::server::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    fn from_ping(connected: bool) -> (StatusCode, Self) {
        let (status, code, message) = if connected {
            ("healthy", StatusCode::OK, "Database is connected")
        } else {
            ("unhealthy", StatusCode::SERVICE_UNAVAILABLE, "Database is disconnected")
        };
        (
            code,
            Self {
                status,
                message,
                timestamp: Utc::now(),
            },
        )
    }
}

/// GET /health
async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let connected = match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("health check failed: {}", e);
            false
        }
    };
    let (code, body) = HealthResponse::from_ping(connected);
    (code, Json(body))
}

#[derive(Serialize)]
pub struct MeResponse {
    pub message: &'static str,
    pub user: User,
}

/// GET /api/me
async fn me(auth: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        message: "This is private",
        user: auth.user,
    })
}

/// Health routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/api/me", get(me))
}
