//! Sort direction and whitelisted sort columns
//!
//! Column names are pushed into SQL text, so they only ever come from
//! these enums, never from request strings.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySortField {
    #[default]
    Name,
    CreatedAt,
    UpdatedAt,
}

impl CategorySortField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Name => "c.name",
            Self::CreatedAt => "c.created_at",
            Self::UpdatedAt => "c.updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpertSortField {
    FirstName,
    LastName,
    #[default]
    CreatedAt,
    UpdatedAt,
    AverageRating,
    TotalSessions,
}

impl ExpertSortField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::FirstName => "e.first_name",
            Self::LastName => "e.last_name",
            Self::CreatedAt => "e.created_at",
            Self::UpdatedAt => "e.updated_at",
            Self::AverageRating => "e.average_rating",
            Self::TotalSessions => "e.total_sessions",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_qualified() {
        assert_eq!(CategorySortField::default().column(), "c.name");
        assert_eq!(ExpertSortField::default().column(), "e.created_at");
        assert_eq!(ExpertSortField::AverageRating.column(), "e.average_rating");
    }

    #[test]
    fn deserializes_snake_case() {
        let field: ExpertSortField = serde_json::from_str("\"total_sessions\"").unwrap();
        assert_eq!(field, ExpertSortField::TotalSessions);
        let order: SortOrder = serde_json::from_str("\"desc\"").unwrap();
        assert_eq!(order.as_sql(), "DESC");
        assert!(serde_json::from_str::<ExpertSortField>("\"bio\"").is_err());
    }
}
