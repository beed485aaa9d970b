//! expertly-server: HTTP API for the expertly marketplace
//!
//! Customers browse experts by category and specialization; experts keep
//! a profile; admins curate categories, verification and testimonials.
//! Sign-in is by phone one-time code with opaque bearer sessions.

pub mod models;

pub mod auth;
pub mod db;
pub mod http;

pub use db::{create_pool, migrate, DbError};
pub use http::{build_router, run_server, ApiError, AppState, ServerConfig, ServerError};
