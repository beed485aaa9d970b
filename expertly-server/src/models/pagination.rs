//! Pagination types

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Maximum items per page
pub const MAX_LIMIT: u32 = 100;

/// Default items per page
pub const DEFAULT_LIMIT: u32 = 20;

/// Validated pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Page number (1-indexed)
    pub page: u32,
    /// Items per page (1..=100)
    pub limit: u32,
}

impl Pagination {
    /// Create pagination, rejecting out-of-range values.
    ///
    /// - page must be >= 1
    /// - limit must be in 1..=100
    pub fn new(page: u32, limit: u32) -> Result<Self, ValidationError> {
        if page < 1 {
            return Err(ValidationError::OutOfRange {
                field: "page",
                min: 1.0,
                max: None,
            });
        }
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(ValidationError::OutOfRange {
                field: "limit",
                min: 1.0,
                max: Some(MAX_LIMIT as f64),
            });
        }
        Ok(Self { page, limit })
    }

    /// SQL OFFSET value.
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }

    /// SQL LIMIT value.
    pub fn limit(&self) -> i64 {
        self.limit as i64
    }

    /// Page metadata for a result set of `total` rows.
    pub fn info(&self, total: i64) -> PageInfo {
        PageInfo::new(self.page, self.limit, total)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Pagination block returned alongside list results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl PageInfo {
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let limit_i = limit.max(1) as i64;
        Self {
            page,
            limit,
            total,
            total_pages: (total.max(0) + limit_i - 1) / limit_i,
        }
    }
}

/// Query parameters for pagination
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl TryFrom<PaginationParams> for Pagination {
    type Error = ValidationError;

    fn try_from(params: PaginationParams) -> Result<Self, Self::Error> {
        Self::new(
            params.page.unwrap_or(1),
            params.limit.unwrap_or(DEFAULT_LIMIT),
        )
    }
}
