//! Shared building blocks for the expertly workspace.
//!
//! Configuration is file-first (`~/.expertly/config.toml`) with environment
//! overrides, so the server and CLI agree on where settings come from.

pub mod config;
pub mod error;

pub use config::{AuthConfig, DatabaseConfig, ExpertlyConfig, ServerSection, SmsConfig};
pub use error::{CoreError, Result};
