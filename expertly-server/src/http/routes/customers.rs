//! Customer profile endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::db::{Customer, CustomerRepo, CustomerWithUser};
use crate::http::error::ApiError;
use crate::http::extractors::{AdminUser, AuthUser, ValidJson, ValidQuery};
use crate::http::server::AppState;
use crate::models::{CustomerProfile, PageInfo, Pagination, PaginationParams};

#[derive(Serialize)]
pub struct CustomerPage {
    pub customers: Vec<CustomerWithUser>,
    pub pagination: PageInfo,
}

/// GET /api/customers/me
async fn my_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Customer>, ApiError> {
    Ok(Json(CustomerRepo::new(&state.pool).get_by_user(auth.user.id).await?))
}

/// PUT /api/customers/me
async fn save_my_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidJson(mut profile): ValidJson<CustomerProfile>,
) -> Result<Json<Customer>, ApiError> {
    profile.validate()?;
    let customer = CustomerRepo::new(&state.pool)
        .upsert(auth.user.id, profile)
        .await?;
    Ok(Json(customer))
}

/// GET /api/customers (admin)
async fn list_customers(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<CustomerPage>, ApiError> {
    let page = Pagination::try_from(params)?;
    let (customers, total) = CustomerRepo::new(&state.pool).list(page).await?;
    Ok(Json(CustomerPage {
        customers,
        pagination: page.info(total),
    }))
}

/// Customer routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/customers", get(list_customers))
        .route("/api/customers/me", get(my_profile).put(save_my_profile))
}
