//! Testimonial endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::{Testimonial, TestimonialRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{AdminUser, ValidJson};
use crate::http::server::AppState;
use crate::models::NewTestimonial;

#[derive(Deserialize)]
pub struct CreateTestimonialRequest {
    pub rating: i32,
    pub user_name: String,
    pub user_image: String,
    pub message: String,
}

/// GET /api/testimonials - five most recent
async fn latest(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Testimonial>>, ApiError> {
    Ok(Json(TestimonialRepo::new(&state.pool).latest().await?))
}

/// POST /api/testimonials (admin)
async fn create(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ValidJson(req): ValidJson<CreateTestimonialRequest>,
) -> Result<(StatusCode, Json<Testimonial>), ApiError> {
    let new = NewTestimonial::new(req.rating, &req.user_name, &req.user_image, &req.message)?;
    let testimonial = TestimonialRepo::new(&state.pool).create(new).await?;
    Ok((StatusCode::CREATED, Json(testimonial)))
}

/// Testimonial routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/testimonials", get(latest).post(create))
}
