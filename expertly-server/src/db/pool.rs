//! Postgres pool construction and schema migration

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Sizing for the shared pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    /// How long a handler waits for a free connection before failing.
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

impl PoolSettings {
    pub fn with_max_connections(max_connections: u32) -> Self {
        Self {
            max_connections: max_connections.max(1),
            ..Self::default()
        }
    }

    fn options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
    }
}

/// Connect with default [`PoolSettings`].
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    open_pool(database_url, PoolSettings::default()).await
}

pub async fn open_pool(database_url: &str, settings: PoolSettings) -> Result<PgPool, sqlx::Error> {
    tracing::debug!(
        max_connections = settings.max_connections,
        acquire_timeout_ms = settings.acquire_timeout.as_millis() as u64,
        "opening database pool"
    );
    settings.options().connect(database_url).await
}

/// Apply every pending migration in [`super::MIGRATOR`].
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    super::MIGRATOR.run(pool).await?;
    tracing::info!("database migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_reach_pool_options() {
        let settings = PoolSettings::with_max_connections(3);
        let options = settings.options();
        assert_eq!(options.get_max_connections(), 3);
        assert_eq!(options.get_acquire_timeout(), Duration::from_secs(5));

        assert_eq!(PoolSettings::with_max_connections(0).max_connections, 1);
    }

    // DATABASE_URL=postgres://... cargo test -p expertly-server -- --ignored
    #[tokio::test]
    #[ignore = "requires database"]
    async fn small_pool_serves_more_tasks_than_connections() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = open_pool(&url, PoolSettings::with_max_connections(2)).await.unwrap();
        migrate(&pool).await.unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for n in 0..8i32 {
            let pool = pool.clone();
            tasks.spawn(async move {
                let (echoed,): (i32,) = sqlx::query_as("SELECT $1::int")
                    .bind(n)
                    .fetch_one(&pool)
                    .await
                    .unwrap();
                (n, echoed)
            });
        }
        while let Some(joined) = tasks.join_next().await {
            let (n, echoed) = joined.unwrap();
            assert_eq!(n, echoed);
        }
    }
}
