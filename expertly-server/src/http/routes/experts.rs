//! Expert endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::pagination;
use crate::db::{Expert, ExpertRepo, ExpertStatistics, ExpertWithRelations};
use crate::http::error::ApiError;
use crate::http::extractors::{AdminUser, AuthUser, ValidJson, ValidQuery, ValidUuid};
use crate::http::server::AppState;
use crate::models::expert::split_list;
use crate::models::validation::in_range;
use crate::models::{
    AccountStatus, ExpertChanges, ExpertFilter, ExpertProfileInput, ExpertSortField, Language,
    NewExpert, PageInfo, Pagination, SortOrder, ValidationError, VerificationStatus,
};

/// Query parameters for expert listings
///
/// `skills` and `languages` are comma separated.
#[derive(Debug, Default, Deserialize)]
pub struct ListExpertsParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category_id: Option<Uuid>,
    pub sort_by: Option<ExpertSortField>,
    pub sort_order: Option<SortOrder>,
    pub search_keyword: Option<String>,
    pub account_status: Option<AccountStatus>,
    pub verification_status: Option<VerificationStatus>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub min_rating: Option<f64>,
    pub max_rating: Option<f64>,
    pub min_rate: Option<f64>,
    pub max_rate: Option<f64>,
    pub skills: Option<String>,
    pub languages: Option<String>,
    pub min_years_of_experience: Option<i32>,
}

impl ListExpertsParams {
    fn into_parts(self) -> Result<(ExpertFilter, Pagination), ValidationError> {
        let page = pagination(self.page, self.limit)?;
        let languages = split_list(self.languages.as_deref())
            .iter()
            .map(|l| l.parse::<Language>())
            .collect::<Result<Vec<_>, _>>()?;

        let filter = ExpertFilter {
            category_id: self.category_id,
            search_keyword: self.search_keyword,
            account_status: self.account_status,
            verification_status: self.verification_status,
            city: self.city,
            state: self.state,
            min_rating: self.min_rating,
            max_rating: self.max_rating,
            min_rate: self.min_rate,
            max_rate: self.max_rate,
            skills: split_list(self.skills.as_deref()),
            languages,
            min_years_of_experience: self.min_years_of_experience,
            sort_by: self.sort_by.unwrap_or_default(),
            sort_order: self.sort_order,
        };
        filter.validate()?;
        Ok((filter, page))
    }
}

#[derive(Deserialize)]
pub struct CreateExpertRequest {
    /// Admins may create a profile for another user
    pub user_id: Option<Uuid>,
    #[serde(flatten)]
    pub profile: ExpertProfileInput,
}

#[derive(Deserialize)]
pub struct UpdateExpertRequest {
    #[serde(flatten)]
    pub profile: ExpertProfileInput,
    pub account_status: Option<AccountStatus>,
    pub verification_status: Option<VerificationStatus>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub account_status: Option<AccountStatus>,
    pub verification_status: Option<VerificationStatus>,
}

#[derive(Deserialize)]
pub struct UpdateRatingRequest {
    pub average_rating: Option<f64>,
    pub total_sessions: Option<i32>,
}

impl UpdateRatingRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(rating) = self.average_rating {
            in_range("average_rating", rating, 0.0, Some(5.0))?;
        }
        if let Some(sessions) = self.total_sessions {
            in_range("total_sessions", sessions as f64, 0.0, None)?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
pub struct ExpertPage {
    pub experts: Vec<ExpertWithRelations>,
    pub pagination: PageInfo,
}

#[derive(Serialize)]
pub struct DeleteExpertResponse {
    pub success: bool,
    pub deleted_expert: Expert,
}

async fn search(
    state: &AppState,
    filter: ExpertFilter,
    page: Pagination,
) -> Result<Json<ExpertPage>, ApiError> {
    let (experts, total) = ExpertRepo::new(&state.pool).search(&filter, page).await?;
    Ok(Json(ExpertPage {
        experts,
        pagination: page.info(total),
    }))
}

/// GET /api/experts
async fn list_experts(
    State(state): State<Arc<AppState>>,
    ValidQuery(params): ValidQuery<ListExpertsParams>,
) -> Result<Json<ExpertPage>, ApiError> {
    let (filter, page) = params.into_parts()?;
    search(&state, filter, page).await
}

/// GET /api/experts/verified
async fn verified_experts(
    State(state): State<Arc<AppState>>,
    ValidQuery(params): ValidQuery<ListExpertsParams>,
) -> Result<Json<ExpertPage>, ApiError> {
    let (filter, page) = params.into_parts()?;
    search(&state, filter.verified_only(), page).await
}

/// GET /api/experts/{id}
async fn get_expert(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<ExpertWithRelations>, ApiError> {
    Ok(Json(ExpertRepo::new(&state.pool).get_with_user(id).await?))
}

/// GET /api/experts/{id}/with-user
async fn get_expert_with_user(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<ExpertWithRelations>, ApiError> {
    Ok(Json(ExpertRepo::new(&state.pool).get_with_user(id).await?))
}

/// GET /api/experts/by-user/{user_id}
async fn get_expert_by_user(
    State(state): State<Arc<AppState>>,
    ValidUuid(user_id): ValidUuid,
) -> Result<Json<ExpertWithRelations>, ApiError> {
    Ok(Json(ExpertRepo::new(&state.pool).get_by_user(user_id).await?))
}

/// POST /api/experts
async fn create_expert(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidJson(req): ValidJson<CreateExpertRequest>,
) -> Result<(StatusCode, Json<Expert>), ApiError> {
    let user_id = req.user_id.unwrap_or(auth.user.id);
    auth.require_owner(user_id, "You can only create your own expert profile")?;

    let new = NewExpert::new(user_id, req.profile)?;
    let expert = ExpertRepo::new(&state.pool).create(new).await?;
    tracing::info!(expert = %expert.id, user = %user_id, "expert profile created");
    Ok((StatusCode::CREATED, Json(expert)))
}

/// PUT /api/experts/{id}
///
/// Status fields are ignored unless the caller is an admin.
async fn update_expert(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidUuid(id): ValidUuid,
    ValidJson(req): ValidJson<UpdateExpertRequest>,
) -> Result<Json<Expert>, ApiError> {
    let mut changes = ExpertChanges::new(req.profile, req.account_status, req.verification_status)?;
    let repo = ExpertRepo::new(&state.pool);

    let current = repo.get(id).await?;
    auth.require_owner(current.user_id, "You can only update your own expert profile")?;
    if !auth.is_admin() {
        changes.strip_admin_fields();
    }

    Ok(Json(repo.update(id, changes).await?))
}

/// PATCH /api/experts/{id}/status (admin)
async fn update_status(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ValidUuid(id): ValidUuid,
    ValidJson(req): ValidJson<UpdateStatusRequest>,
) -> Result<Json<Expert>, ApiError> {
    if req.account_status.is_none() && req.verification_status.is_none() {
        return Err(ValidationError::rule("Provide account_status or verification_status").into());
    }
    let expert = ExpertRepo::new(&state.pool)
        .update_status(id, req.account_status, req.verification_status)
        .await?;
    tracing::info!(
        expert = %expert.id,
        account_status = %expert.account_status,
        verification_status = %expert.verification_status,
        "expert status updated"
    );
    Ok(Json(expert))
}

/// PATCH /api/experts/{id}/rating (admin)
async fn update_rating(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ValidUuid(id): ValidUuid,
    ValidJson(req): ValidJson<UpdateRatingRequest>,
) -> Result<Json<Expert>, ApiError> {
    req.validate()?;
    let expert = ExpertRepo::new(&state.pool)
        .update_rating(id, req.average_rating, req.total_sessions)
        .await?;
    Ok(Json(expert))
}

/// DELETE /api/experts/{id} (admin)
async fn delete_expert(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ValidUuid(id): ValidUuid,
) -> Result<Json<DeleteExpertResponse>, ApiError> {
    let deleted = ExpertRepo::new(&state.pool).delete(id).await?;
    tracing::info!(expert = %deleted.id, "expert deleted");
    Ok(Json(DeleteExpertResponse {
        success: true,
        deleted_expert: deleted,
    }))
}

/// GET /api/experts/statistics (admin)
async fn statistics(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<ExpertStatistics>, ApiError> {
    Ok(Json(ExpertRepo::new(&state.pool).statistics().await?))
}

/// Expert routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/experts", get(list_experts).post(create_expert))
        .route("/api/experts/verified", get(verified_experts))
        .route("/api/experts/statistics", get(statistics))
        .route("/api/experts/by-user/{user_id}", get(get_expert_by_user))
        .route(
            "/api/experts/{id}",
            get(get_expert).put(update_expert).delete(delete_expert),
        )
        .route("/api/experts/{id}/with-user", get(get_expert_with_user))
        .route("/api/experts/{id}/status", patch(update_status))
        .route("/api/experts/{id}/rating", patch(update_rating))
}
