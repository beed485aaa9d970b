//! Category endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::pagination;
use crate::db::{Category, CategoryQuery, CategoryRepo, CategoryWithCount, CategoryWithRelations};
use crate::http::error::ApiError;
use crate::http::extractors::{AdminUser, ValidJson, ValidQuery, ValidUuid};
use crate::http::server::AppState;
use crate::models::{CategoryChanges, CategorySortField, NewCategory, PageInfo, ParentFilter, SortOrder};

/// Query parameters for GET /api/categories
#[derive(Debug, Default, Deserialize)]
pub struct ListCategoriesParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<CategorySortField>,
    pub sort_order: Option<SortOrder>,
    pub parent_id: Option<String>,
    pub active_only: Option<bool>,
}

impl ListCategoriesParams {
    fn into_query(self) -> Result<CategoryQuery, ApiError> {
        let parent = self
            .parent_id
            .as_deref()
            .map(str::parse::<ParentFilter>)
            .transpose()?;
        Ok(CategoryQuery {
            parent,
            active_only: self.active_only.unwrap_or(true),
            sort_by: self.sort_by.unwrap_or_default(),
            sort_order: self.sort_order.unwrap_or(SortOrder::Asc),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ChildrenParams {
    pub active_only: Option<bool>,
}

#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
    pub parent_category_id: Option<Uuid>,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent_category_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub is_primary: Option<bool>,
}

#[derive(Serialize)]
pub struct CategoryPage {
    pub categories: Vec<CategoryWithRelations>,
    pub pagination: PageInfo,
}

#[derive(Serialize)]
pub struct DeleteCategoryResponse {
    pub success: bool,
    pub deleted_category: Category,
}

/// GET /api/categories
async fn list_categories(
    State(state): State<Arc<AppState>>,
    ValidQuery(params): ValidQuery<ListCategoriesParams>,
) -> Result<Json<CategoryPage>, ApiError> {
    let page = pagination(params.page, params.limit)?;
    let query = params.into_query()?;
    let (categories, total) = CategoryRepo::new(&state.pool).list(&query, page).await?;
    Ok(Json(CategoryPage {
        categories,
        pagination: page.info(total),
    }))
}

/// GET /api/categories/{id}
async fn get_category(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<CategoryWithRelations>, ApiError> {
    let category = CategoryRepo::new(&state.pool).get(id).await?;
    Ok(Json(category))
}

/// GET /api/categories/roots
async fn root_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CategoryWithRelations>>, ApiError> {
    Ok(Json(CategoryRepo::new(&state.pool).roots().await?))
}

/// GET /api/categories/{id}/children
async fn child_categories(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    ValidQuery(params): ValidQuery<ChildrenParams>,
) -> Result<Json<Vec<CategoryWithRelations>>, ApiError> {
    let children = CategoryRepo::new(&state.pool)
        .children(id, params.active_only.unwrap_or(true))
        .await?;
    Ok(Json(children))
}

/// GET /api/categories/with-expert-count
async fn with_expert_count(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CategoryWithCount>>, ApiError> {
    Ok(Json(CategoryRepo::new(&state.pool).with_expert_count().await?))
}

/// POST /api/categories (admin)
async fn create_category(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ValidJson(req): ValidJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let new = NewCategory::new(&req.name, req.description, req.parent_category_id, req.is_primary)?;
    let category = CategoryRepo::new(&state.pool).create(new).await?;
    tracing::info!(category = %category.id, admin = %admin.user.id, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/categories/{id} (admin)
async fn update_category(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ValidUuid(id): ValidUuid,
    ValidJson(req): ValidJson<UpdateCategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    let changes = CategoryChanges::new(
        id,
        req.name.as_deref(),
        req.description,
        req.parent_category_id,
        req.is_active,
        req.is_primary,
    )?;
    let category = CategoryRepo::new(&state.pool).update(id, changes).await?;
    Ok(Json(category))
}

/// DELETE /api/categories/{id} (admin)
async fn delete_category(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ValidUuid(id): ValidUuid,
) -> Result<Json<DeleteCategoryResponse>, ApiError> {
    let deleted = CategoryRepo::new(&state.pool).delete(id).await?;
    tracing::info!(category = %deleted.id, "category deleted");
    Ok(Json(DeleteCategoryResponse {
        success: true,
        deleted_category: deleted,
    }))
}

/// Category routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/categories", get(list_categories).post(create_category))
        .route("/api/categories/roots", get(root_categories))
        .route("/api/categories/with-expert-count", get(with_expert_count))
        .route(
            "/api/categories/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/api/categories/{id}/children", get(child_categories))
}
