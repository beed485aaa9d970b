//! Category input validation
//!
//! Categories form a tree through `parent_category_id`. The rules that need
//! the database (parent exists, no cycles, no children on delete) live in
//! the repository; the rules here only need the request itself.

use std::str::FromStr;

use uuid::Uuid;

use super::validation::{optional_max_len, required_text};
use super::ValidationError;

/// Maximum length for category names
const MAX_NAME_LEN: usize = 255;

/// Maximum length for category descriptions
const MAX_DESCRIPTION_LEN: usize = 2000;

/// Validated category name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Rules
    /// - Non-empty after trimming ("Name is required")
    /// - Max 255 characters ("Name too long")
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        required_text("name", s, MAX_NAME_LEN).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Which parent to list under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentFilter {
    /// Top-level categories only
    Root,
    /// Direct children of the given category
    Id(Uuid),
}

impl FromStr for ParentFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" | "none" | "null" => Ok(Self::Root),
            other => Uuid::parse_str(other)
                .map(Self::Id)
                .map_err(|_| ValidationError::InvalidFormat {
                    field: "parent_id",
                    reason: "must be a UUID or 'root'",
                }),
        }
    }
}

/// Validated input for creating a category
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: CategoryName,
    pub description: Option<String>,
    pub parent_category_id: Option<Uuid>,
    pub is_primary: bool,
}

impl NewCategory {
    pub fn new(
        name: &str,
        description: Option<String>,
        parent_category_id: Option<Uuid>,
        is_primary: bool,
    ) -> Result<Self, ValidationError> {
        optional_max_len("description", description.as_deref(), MAX_DESCRIPTION_LEN)?;
        Ok(Self {
            name: CategoryName::new(name)?,
            description,
            parent_category_id,
            is_primary,
        })
    }
}

/// Validated partial update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct CategoryChanges {
    pub name: Option<CategoryName>,
    pub description: Option<String>,
    pub parent_category_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub is_primary: Option<bool>,
}

impl CategoryChanges {
    /// Validate changes for category `id`.
    ///
    /// Self-parenting is rejected here; deeper cycles are checked against
    /// the stored tree by the repository.
    pub fn new(
        id: Uuid,
        name: Option<&str>,
        description: Option<String>,
        parent_category_id: Option<Uuid>,
        is_active: Option<bool>,
        is_primary: Option<bool>,
    ) -> Result<Self, ValidationError> {
        if parent_category_id == Some(id) {
            return Err(ValidationError::rule("Category cannot be its own parent"));
        }
        optional_max_len("description", description.as_deref(), MAX_DESCRIPTION_LEN)?;

        let changes = Self {
            name: name.map(CategoryName::new).transpose()?,
            description,
            parent_category_id,
            is_active,
            is_primary,
        };
        if changes.is_empty() {
            return Err(ValidationError::rule("No fields to update"));
        }
        Ok(changes)
    }

    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.parent_category_id.is_none()
            && self.is_active.is_none()
            && self.is_primary.is_none()
    }
}
