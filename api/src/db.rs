use crate::config::PoolConfig;
use crate::errors::Result;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

pub async fn make_pool(database_url: &str, config: &PoolConfig) -> Result<PgPool> {
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(database_url)
        .await?;

    info!("Database connection established");
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed");

    Ok(pool)
}
