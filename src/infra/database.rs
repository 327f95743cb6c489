//! For interacting with the database.

use super::config::DatabaseConfig;
use sqlx::{pool::PoolOptions, postgres::PgSslMode, ConnectOptions, PgPool};
use tracing::log::LevelFilter;

/// A common database pool type.
pub type DbPool = PgPool;

/// Creates a lazily connecting pool based on some configuration.
pub fn init_db(config: &DatabaseConfig) -> DbPool {
    let db_options = config
        .connect_options()
        .ssl_mode(PgSslMode::Prefer)
        .log_statements(LevelFilter::Debug);
    PoolOptions::default()
        .acquire_timeout(config.acquire_timeout)
        .min_connections(1)
        .max_connections(config.max_connections)
        .connect_lazy_with(db_options)
}

/// Applies the embedded migrations in `./migrations`.
#[tracing::instrument(skip_all)]
pub async fn migrate(db: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    tracing::info!("Running database migrations");
    sqlx::migrate!("./migrations").run(db).await?;
    tracing::info!("Database migrations completed");
    Ok(())
}
