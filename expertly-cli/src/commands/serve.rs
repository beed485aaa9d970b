//! HTTP server command
//!
//! Loads config, applies flag overrides, runs migrations and serves until
//! Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use expertly_core::ExpertlyConfig;
use expertly_server::auth::{AuthSettings, LogSender, OtpSender, WebhookSender};
use expertly_server::db::{migrate, PgPool, SessionRepo};
use expertly_server::http::{run_server, AppState, ServerConfig};

use super::db::{self, DbArgs};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (default from config: 127.0.0.1:3000)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Do not apply pending migrations at startup
    #[arg(long)]
    pub skip_migrations: bool,

    #[command(flatten)]
    pub db: DbArgs,
}

impl ServeArgs {
    fn apply(self, config: &mut ExpertlyConfig) -> bool {
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if self.cors_permissive {
            config.server.cors_permissive = true;
        }
        self.db.apply(config);
        self.skip_migrations
    }
}

/// OTP delivery from config: the webhook when configured, the log otherwise.
fn otp_sender(config: &ExpertlyConfig) -> Result<Arc<dyn OtpSender>> {
    match config.sms.webhook_url.as_deref() {
        Some(url) => {
            let sender = WebhookSender::new(url, config.sms.webhook_token.clone())
                .context("Failed to build OTP webhook client")?;
            Ok(Arc::new(sender))
        }
        None => {
            tracing::warn!("sms.webhook_url not set, one-time codes are written to the log");
            Ok(Arc::new(LogSender))
        }
    }
}

fn app_state(pool: PgPool, config: &ExpertlyConfig) -> Result<AppState> {
    Ok(AppState::new(pool)
        .with_auth(AuthSettings::from(&config.auth))
        .with_otp_sender(otp_sender(config)?))
}

fn server_config(config: &ExpertlyConfig) -> ServerConfig {
    ServerConfig {
        bind_addr: config.server.bind,
        cors_origins: config.server.cors_origins.clone(),
        cors_permissive: config.server.cors_permissive,
    }
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let mut config = ExpertlyConfig::load().context("Failed to load config")?;
    let skip_migrations = args.apply(&mut config);

    let pool = db::connect(&config).await?;
    if skip_migrations {
        tracing::info!("skipping migrations");
    } else {
        migrate(&pool).await.context("Failed to run migrations")?;
    }

    match SessionRepo::new(&pool).purge_expired().await {
        Ok(0) => {}
        Ok(purged) => tracing::info!(purged, "removed expired sessions"),
        Err(e) => tracing::warn!("could not purge expired sessions: {}", e),
    }

    let state = app_state(pool, &config)?;
    run_server(state, server_config(&config))
        .await
        .context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let mut config = ExpertlyConfig::default();
        let args = ServeArgs {
            bind: Some("0.0.0.0:8080".parse().unwrap()),
            cors_permissive: true,
            skip_migrations: true,
            db: DbArgs {
                database_url: Some("postgres://localhost/expertly".into()),
            },
        };

        assert!(args.apply(&mut config));
        assert_eq!(config.server.bind.port(), 8080);
        assert!(config.server.cors_permissive);
        assert_eq!(config.database_url().unwrap(), "postgres://localhost/expertly");

        let server = server_config(&config);
        assert_eq!(server.bind_addr, config.server.bind);
        assert!(server.cors_permissive);
    }

    #[test]
    fn absent_flags_keep_config() {
        let mut config = ExpertlyConfig::default();
        config.server.cors_origins = vec!["https://expertly.example".into()];
        let args = ServeArgs {
            bind: None,
            cors_permissive: false,
            skip_migrations: false,
            db: DbArgs::default(),
        };

        assert!(!args.apply(&mut config));
        assert_eq!(config.server.bind.port(), 3000);
        assert_eq!(server_config(&config).cors_origins, vec!["https://expertly.example"]);
    }

    #[test]
    fn sender_follows_sms_config() {
        let mut config = ExpertlyConfig::default();
        assert_eq!(otp_sender(&config).unwrap().name(), "log");

        config.sms.webhook_url = Some("https://sms.example/send".into());
        assert_eq!(otp_sender(&config).unwrap().name(), "webhook");
    }
}
