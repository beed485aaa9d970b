//! Repository error type

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Postgres SQLSTATE for check_violation
const CHECK_VIOLATION: &str = "23514";

/// Postgres SQLSTATE for foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Postgres SQLSTATE for numeric_value_out_of_range
const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("{resource} not found")]
    NotFound { resource: &'static str, id: String },

    /// The write conflicts with existing rows
    #[error("{0}")]
    Conflict(String),

    /// The write would break a data rule checked against stored rows
    #[error("{0}")]
    Invalid(String),
}

impl DbError {
    pub(crate) fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Map a unique violation to [`DbError::Conflict`] with `message`.
    pub(crate) fn on_unique(err: sqlx::Error, message: &str) -> Self {
        if sqlstate(&err) == Some(UNIQUE_VIOLATION) {
            Self::Conflict(message.to_owned())
        } else {
            Self::Sqlx(err)
        }
    }

    /// Name of the unique constraint or index `err` violated, if any.
    pub(crate) fn unique_constraint(err: &sqlx::Error) -> Option<&str> {
        match err {
            sqlx::Error::Database(db) if sqlstate(err) == Some(UNIQUE_VIOLATION) => db.constraint(),
            _ => None,
        }
    }

    /// Constraint violations and out-of-range values: the caller's fault
    /// rather than ours.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Sqlx(e) if matches!(
            sqlstate(e),
            Some(UNIQUE_VIOLATION | CHECK_VIOLATION | FOREIGN_KEY_VIOLATION | NUMERIC_OUT_OF_RANGE)
        ))
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::Sqlx(e) if sqlstate(e) == Some(UNIQUE_VIOLATION))
    }
}

fn sqlstate(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|c| match c.as_ref() {
            UNIQUE_VIOLATION => UNIQUE_VIOLATION,
            CHECK_VIOLATION => CHECK_VIOLATION,
            FOREIGN_KEY_VIOLATION => FOREIGN_KEY_VIOLATION,
            NUMERIC_OUT_OF_RANGE => NUMERIC_OUT_OF_RANGE,
            _ => "other",
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(DbError::not_found("Category", "x").to_string(), "Category not found");
        assert_eq!(
            DbError::Conflict("Specialization already exists".into()).to_string(),
            "Specialization already exists"
        );
    }

    #[test]
    fn non_database_errors_stay_server_errors() {
        let err = DbError::on_unique(sqlx::Error::RowNotFound, "dup");
        assert!(matches!(err, DbError::Sqlx(_)));
        assert!(!err.is_client_error());
        assert_eq!(DbError::unique_constraint(&sqlx::Error::RowNotFound), None);
    }

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "requires database"]
    async fn numeric_overflow_is_a_client_error(pool: sqlx::PgPool) {
        let err = sqlx::query("SELECT 1e9::numeric(10, 2)")
            .execute(&pool)
            .await
            .unwrap_err();
        let err = DbError::from(err);
        assert!(err.is_client_error());
        assert!(!err.is_unique_violation());
    }
}
