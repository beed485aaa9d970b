use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Centralized configuration for the expertly server and CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpertlyConfig {
    pub server: ServerSection,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub sms: SmsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: SocketAddr,
    /// Origins allowed by CORS (the web front end)
    pub cors_origins: Vec<String>,
    /// Allow any origin. Development only.
    pub cors_permissive: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            cors_origins: vec!["http://localhost:3001".to_string()],
            cors_permissive: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub session_ttl_hours: i64,
    pub otp_ttl_seconds: i64,
    pub otp_max_attempts: i32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: 24 * 7,
            otp_ttl_seconds: 300,
            otp_max_attempts: 3,
        }
    }
}

/// SMS gateway used to deliver OTP codes.
///
/// When `webhook_url` is unset codes are written to the log instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SmsConfig {
    pub webhook_url: Option<String>,
    pub webhook_token: Option<String>,
}

impl ExpertlyConfig {
    /// Load config from `$EXPERTLY_CONFIG` or ~/.expertly/config.toml,
    /// then apply environment overrides.
    ///
    /// A missing file is not an error: defaults plus environment are enough
    /// to run the server.
    pub fn load() -> Result<Self> {
        // .env is optional
        dotenvy::dotenv().ok();

        let path = Self::config_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };

        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a config file without applying environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|source| CoreError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.expand_variables(|key| env::var(key).ok());
        Ok(config)
    }

    /// Config file path: `$EXPERTLY_CONFIG` or ~/.expertly/config.toml
    pub fn config_path() -> PathBuf {
        if let Ok(path) = env::var("EXPERTLY_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".expertly/config.toml")
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            self.database.url = Some(url);
        }

        if let Some(bind) = lookup("EXPERTLY_BIND") {
            self.server.bind = bind
                .parse()
                .map_err(|_| CoreError::invalid_value("EXPERTLY_BIND", &bind))?;
        }

        if let Some(origins) = lookup("CORS_ORIGIN").filter(|v| !v.is_empty()) {
            self.server.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        if let Some(url) = lookup("OTP_WEBHOOK_URL").filter(|v| !v.is_empty()) {
            self.sms.webhook_url = Some(url);
        }
        if let Some(token) = lookup("OTP_WEBHOOK_TOKEN").filter(|v| !v.is_empty()) {
            self.sms.webhook_token = Some(token);
        }

        Ok(())
    }

    /// Expand ${VAR} references in secret-bearing strings
    fn expand_variables<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut vars = HashMap::new();
        for key in ["HOME", "DATABASE_URL", "OTP_WEBHOOK_TOKEN"] {
            vars.insert(key.to_string(), lookup(key).unwrap_or_default());
        }

        if let Some(ref url) = self.database.url {
            self.database.url = Some(Self::expand_string(url, &vars));
        }
        if let Some(ref token) = self.sms.webhook_token {
            self.sms.webhook_token = Some(Self::expand_string(token, &vars));
        }
    }

    fn expand_string(s: &str, vars: &HashMap<String, String>) -> String {
        let mut result = s.to_string();

        for (key, value) in vars {
            let pattern = format!("${{{}}}", key);
            result = result.replace(&pattern, value);
        }

        result
    }

    /// Database URL after merge, or an actionable error.
    pub fn database_url(&self) -> Result<&str> {
        self.database.url.as_deref().ok_or(CoreError::Missing {
            key: "database.url",
            hint: "Set DATABASE_URL, add it to .env, or run: expertly config init",
        })
    }

    /// Serialize to pretty TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_of(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn defaults_are_sane() {
        let config = ExpertlyConfig::default();
        assert_eq!(config.server.bind.port(), 3000);
        assert!(!config.server.cors_permissive);
        assert_eq!(config.auth.otp_ttl_seconds, 300);
        assert_eq!(config.auth.otp_max_attempts, 3);
        assert!(config.database.url.is_none());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: ExpertlyConfig = toml::from_str(
            r#"
            [database]
            url = "postgres://localhost/expertly"

            [auth]
            otp_max_attempts = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.database_url().unwrap(), "postgres://localhost/expertly");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.auth.otp_max_attempts, 5);
        assert_eq!(config.auth.otp_ttl_seconds, 300);
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = ExpertlyConfig::default();
        config
            .apply_overrides(env_of(&[
                ("DATABASE_URL", "postgres://db/override"),
                ("EXPERTLY_BIND", "0.0.0.0:8080"),
                ("CORS_ORIGIN", "https://a.example, https://b.example"),
            ]))
            .unwrap();

        assert_eq!(config.database_url().unwrap(), "postgres://db/override");
        assert_eq!(config.server.bind.port(), 8080);
        assert_eq!(
            config.server.cors_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn bad_bind_is_rejected() {
        let mut config = ExpertlyConfig::default();
        let err = config
            .apply_overrides(env_of(&[("EXPERTLY_BIND", "not-an-addr")]))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidValue { .. }));
    }

    #[test]
    fn missing_database_url_is_actionable() {
        let config = ExpertlyConfig::default();
        let err = config.database_url().unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn variables_expand() {
        let mut config = ExpertlyConfig::default();
        config.sms.webhook_token = Some("${OTP_WEBHOOK_TOKEN}".into());
        config.expand_variables(env_of(&[("OTP_WEBHOOK_TOKEN", "s3cret")]));
        assert_eq!(config.sms.webhook_token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut config = ExpertlyConfig::default();
        config.database.url = Some("postgres://localhost/roundtrip".into());
        config.save_to(&path).unwrap();

        let loaded = ExpertlyConfig::load_from(&path).unwrap();
        assert_eq!(loaded.database_url().unwrap(), "postgres://localhost/roundtrip");
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server\nbind = 1").unwrap();

        let err = ExpertlyConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, CoreError::ConfigParse { .. }));
    }
}
