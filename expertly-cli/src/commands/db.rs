//! Database connection shared by commands, and the `migrate` command

use anyhow::{Context, Result};
use clap::Parser;
use expertly_core::ExpertlyConfig;
use expertly_server::db::{migrate, open_pool, PgPool, PoolSettings};

/// Connection options common to every database-backed command
#[derive(Parser, Debug, Default)]
pub struct DbArgs {
    /// Database URL (overrides config/environment)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

impl DbArgs {
    /// Merge the flag into the loaded config.
    pub fn apply(self, config: &mut ExpertlyConfig) {
        if let Some(url) = self.database_url.filter(|u| !u.is_empty()) {
            config.database.url = Some(url);
        }
    }
}

/// Open a pool from the merged config.
pub async fn connect(config: &ExpertlyConfig) -> Result<PgPool> {
    let url = config.database_url()?;
    open_pool(url, PoolSettings::with_max_connections(config.database.max_connections))
        .await
        .context("Failed to connect to database")
}

/// Load config with the `--database-url` override applied, then connect.
pub async fn connect_with(args: DbArgs) -> Result<(ExpertlyConfig, PgPool)> {
    let mut config = ExpertlyConfig::load().context("Failed to load config")?;
    args.apply(&mut config);
    let pool = connect(&config).await?;
    Ok((config, pool))
}

/// Apply pending migrations and exit
pub async fn run_migrate(args: DbArgs) -> Result<()> {
    let (_, pool) = connect_with(args).await?;
    migrate(&pool).await.context("Failed to run migrations")?;
    println!("Migrations applied");
    Ok(())
}
