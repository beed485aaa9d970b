//! Specialization endpoints
//!
//! Reads are public. Writes need the owner of the expert profile or an
//! admin.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::pagination;
use crate::db::{
    DbError, ExpertRepo, Specialization, SpecializationDetail, SpecializationQuery,
    SpecializationRepo,
};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, ValidJson, ValidQuery, ValidUuid};
use crate::http::server::AppState;
use crate::models::PageInfo;

const NOT_OWNER: &str = "You can only manage specializations on your own expert profile";

#[derive(Debug, Default, Deserialize)]
pub struct ListSpecializationsParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub expert_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub is_primary: Option<bool>,
}

#[derive(Deserialize)]
pub struct CreateSpecializationRequest {
    pub expert_id: Uuid,
    pub category_id: Uuid,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Deserialize)]
pub struct UpdateSpecializationRequest {
    pub is_primary: bool,
}

#[derive(Serialize)]
pub struct SpecializationPage {
    pub specializations: Vec<SpecializationDetail>,
    pub pagination: PageInfo,
}

#[derive(Serialize)]
pub struct DeleteSpecializationResponse {
    pub success: bool,
    pub deleted_specialization: Specialization,
}

/// GET /api/specializations
async fn list_specializations(
    State(state): State<Arc<AppState>>,
    ValidQuery(params): ValidQuery<ListSpecializationsParams>,
) -> Result<Json<SpecializationPage>, ApiError> {
    let page = pagination(params.page, params.limit)?;
    let query = SpecializationQuery {
        expert_id: params.expert_id,
        category_id: params.category_id,
        is_primary: params.is_primary,
    };
    let (specializations, total) = SpecializationRepo::new(&state.pool).list(&query, page).await?;
    Ok(Json(SpecializationPage {
        specializations,
        pagination: page.info(total),
    }))
}

/// GET /api/specializations/{id}
async fn get_specialization(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<SpecializationDetail>, ApiError> {
    Ok(Json(SpecializationRepo::new(&state.pool).get(id).await?))
}

/// GET /api/experts/{id}/specializations
async fn by_expert(
    State(state): State<Arc<AppState>>,
    ValidUuid(expert_id): ValidUuid,
) -> Result<Json<Vec<SpecializationDetail>>, ApiError> {
    Ok(Json(SpecializationRepo::new(&state.pool).by_expert(expert_id).await?))
}

/// GET /api/categories/{id}/specializations
async fn by_category(
    State(state): State<Arc<AppState>>,
    ValidUuid(category_id): ValidUuid,
) -> Result<Json<Vec<SpecializationDetail>>, ApiError> {
    Ok(Json(SpecializationRepo::new(&state.pool).by_category(category_id).await?))
}

/// GET /api/experts/{id}/specializations/primary
async fn primary_by_expert(
    State(state): State<Arc<AppState>>,
    ValidUuid(expert_id): ValidUuid,
) -> Result<Json<Option<SpecializationDetail>>, ApiError> {
    let primary = SpecializationRepo::new(&state.pool)
        .primary_for_expert(expert_id)
        .await?;
    Ok(Json(primary))
}

/// POST /api/specializations
async fn create_specialization(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidJson(req): ValidJson<CreateSpecializationRequest>,
) -> Result<(StatusCode, Json<Specialization>), ApiError> {
    let expert = ExpertRepo::new(&state.pool).get(req.expert_id).await?;
    auth.require_owner(expert.user_id, NOT_OWNER)?;

    let created = SpecializationRepo::new(&state.pool)
        .create(req.expert_id, req.category_id, req.is_primary)
        .await
        .map_err(|e| match e {
            DbError::NotFound { resource: "Category", .. } => {
                ApiError::not_found("Category not found or inactive")
            }
            other => other.into(),
        })?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn authorize(state: &AppState, auth: &AuthUser, id: Uuid) -> Result<(), ApiError> {
    let owner = SpecializationRepo::new(&state.pool).owner_of(id).await?;
    auth.require_owner(owner, NOT_OWNER)
}

/// PUT /api/specializations/{id}
async fn update_specialization(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidUuid(id): ValidUuid,
    ValidJson(req): ValidJson<UpdateSpecializationRequest>,
) -> Result<Json<Specialization>, ApiError> {
    authorize(&state, &auth, id).await?;
    let updated = SpecializationRepo::new(&state.pool)
        .update(id, req.is_primary)
        .await?;
    Ok(Json(updated))
}

/// POST /api/specializations/{id}/primary
async fn set_primary(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidUuid(id): ValidUuid,
) -> Result<Json<Specialization>, ApiError> {
    authorize(&state, &auth, id).await?;
    Ok(Json(SpecializationRepo::new(&state.pool).set_primary(id).await?))
}

/// DELETE /api/specializations/{id}
async fn delete_specialization(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidUuid(id): ValidUuid,
) -> Result<Json<DeleteSpecializationResponse>, ApiError> {
    authorize(&state, &auth, id).await?;
    let deleted = SpecializationRepo::new(&state.pool).delete(id).await?;
    Ok(Json(DeleteSpecializationResponse {
        success: true,
        deleted_specialization: deleted,
    }))
}

/// Specialization routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/specializations",
            get(list_specializations).post(create_specialization),
        )
        .route(
            "/api/specializations/{id}",
            get(get_specialization)
                .put(update_specialization)
                .delete(delete_specialization),
        )
        .route("/api/specializations/{id}/primary", post(set_primary))
        .route("/api/experts/{id}/specializations", get(by_expert))
        .route("/api/experts/{id}/specializations/primary", get(primary_by_expert))
        .route("/api/categories/{id}/specializations", get(by_category))
}
