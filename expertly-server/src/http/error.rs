//! API error types with IntoResponse
//!
//! Errors are converted to JSON responses `{error, message}` with
//! appropriate status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::AuthError;
use crate::db::DbError;
use crate::models::ValidationError;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Validation failed (400)
    Validation(ValidationError),

    /// Request rejected for a reason stated in `message` (400)
    BadRequest { message: String },

    /// Missing, invalid or expired session (401)
    Unauthorized,

    /// Authenticated but not allowed (403)
    Forbidden { reason: String },

    /// Resource not found (404)
    NotFound { message: String },

    /// Conflicts with existing data (409)
    Conflict { message: String },

    /// Attempt limit reached (429)
    TooManyRequests { message: String },

    /// Database error (500, logged)
    Database(DbError),

    /// Internal error (500, logged)
    Internal { message: String },
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Database(_) | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (kind, message) = match self {
            Self::Validation(e) => ("validation_error", e.to_string()),
            Self::BadRequest { message } => ("bad_request", message),
            Self::Unauthorized => ("unauthorized", "Unauthorized".to_owned()),
            Self::Forbidden { reason } => ("forbidden", reason),
            Self::NotFound { message } => ("not_found", message),
            Self::Conflict { message } => ("conflict", message),
            Self::TooManyRequests { message } => ("too_many_requests", message),
            Self::Database(e) => {
                // Log the actual error, return generic message
                tracing::error!("Database error: {}", e);
                ("internal_error", "an internal error occurred".to_owned())
            }
            Self::Internal { message } => {
                tracing::error!("Internal error: {}", message);
                ("internal_error", "an internal error occurred".to_owned())
            }
        };

        (status, Json(json!({ "error": kind, "message": message }))).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { .. } => Self::not_found(e.to_string()),
            DbError::Conflict(message) => Self::Conflict { message },
            DbError::Invalid(message) => Self::BadRequest { message },
            e if e.is_unique_violation() => Self::Conflict {
                message: "Resource already exists".into(),
            },
            e if e.is_client_error() => Self::bad_request("Request violates a data constraint"),
            e => Self::Database(e),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::OtpNotFound | AuthError::InvalidOtp => Self::bad_request(e.to_string()),
            AuthError::TooManyAttempts => Self::TooManyRequests {
                message: e.to_string(),
            },
            AuthError::Send(err) => Self::Internal {
                message: err.to_string(),
            },
            AuthError::Db(err) => err.into(),
        }
    }
}
