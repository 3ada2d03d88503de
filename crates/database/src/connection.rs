use crate::error::DbError;
use configuration::DatabaseConfig;
use dotenvy::dotenv;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::env;

/// Establishes a connection pool to the PostgreSQL database.
///
/// This function reads `DATABASE_URL` from the environment (a `.env` file is
/// honoured when present) and sizes the pool from the configuration. Batch
/// concurrency should stay below `max_connections`, otherwise batches queue
/// on the pool instead of the admission gate.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DbError> {
    // A missing .env file is fine; the variable may come from the real environment.
    dotenv().ok();

    let database_url = env::var("DATABASE_URL")
        .map_err(|_e| DbError::ConnectionConfigError("DATABASE_URL must be set.".to_string()))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .max_lifetime(config.max_lifetime())
        .connect(&database_url)
        .await
        .map_err(DbError::ConnectionError)?;

    Ok(pool)
}

/// Applies the embedded migrations so `funds` and `nav_records` exist.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    // Use a relative path from the crate root
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
