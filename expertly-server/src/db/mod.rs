//! Database layer - connection pool, migrations and repositories
//!
//! # Design Principles
//!
//! - One bounded `PgPool` shared through application state
//! - List operations embed related rows with JSON subqueries (no N+1)
//! - Rely on DB constraints and map violations (no check-then-insert)
//! - Transactions for multi-step operations

pub mod error;
pub mod pool;
pub mod repos;

pub use error::DbError;
pub use pool::{create_pool, migrate, open_pool, PoolSettings};
pub use repos::*;
pub use sqlx::PgPool;

/// Embedded SQL migrations from the workspace `migrations/` directory
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../migrations");
