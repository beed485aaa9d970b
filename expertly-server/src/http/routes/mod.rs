//! Route handlers organized by resource

pub mod auth;
pub mod categories;
pub mod customers;
pub mod experts;
pub mod health;
pub mod specializations;
pub mod testimonials;

use crate::models::{Pagination, PaginationParams, ValidationError};

/// `page`/`limit` query values into validated pagination.
pub(crate) fn pagination(page: Option<u32>, limit: Option<u32>) -> Result<Pagination, ValidationError> {
    Pagination::try_from(PaginationParams { page, limit })
}
