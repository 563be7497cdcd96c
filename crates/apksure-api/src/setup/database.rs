//! User store pool and schema migrations

use anyhow::{Context, Result};
use apksure_core::Config;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

const IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const MAX_LIFETIME: Duration = Duration::from_secs(30 * 60);

/// Open the PostgreSQL pool behind the user store and bring the schema up to date.
pub async fn setup_database(config: &Config) -> Result<PgPool> {
    let pool = open_pool(config).await?;
    migrate_users(&pool).await?;
    Ok(pool)
}

async fn open_pool(config: &Config) -> Result<PgPool> {
    tracing::info!(
        max_connections = config.db_max_connections(),
        acquire_timeout_secs = config.db_timeout_seconds(),
        "Opening user store pool"
    );

    PgPoolOptions::new()
        .max_connections(config.db_max_connections())
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds()))
        .idle_timeout(IDLE_TIMEOUT)
        .max_lifetime(MAX_LIFETIME)
        .connect(config.database_url())
        .await
        .context("Failed to connect to the user store")
}

/// Migrations are embedded from the workspace `migrations/` directory.
async fn migrate_users(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .context("Failed to migrate the users table")?;
    tracing::info!("User store schema is current");
    Ok(())
}
