//! Command implementations for the expertly CLI

pub mod config;
pub mod db;
pub mod serve;
pub mod sessions;
pub mod user;

pub use config::run_config;
pub use db::run_migrate;
pub use serve::run_serve;
pub use sessions::run_sessions;
pub use user::run_user;
