//! The item catalog service.

use color_eyre::eyre::WrapErr;
use item_catalog::{
    feature::item::{item_repository::PgItemRepository, item_service::ItemServiceImpl},
    infra::{config, database, logging, state::AppState},
    server,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let _ = dotenvy::dotenv();
    let config = config::load_config().wrap_err("failed to load configuration")?;
    let _guard = logging::init_logging(&config.logging);

    let db = database::init_db(&config.database);
    if config.database.run_migrations {
        database::migrate(&db)
            .await
            .wrap_err("failed to run database migrations")?;
    }

    let items = ItemServiceImpl::new(PgItemRepository::new(db.clone()));
    let state = AppState::new(Arc::new(items));

    let listener = TcpListener::bind(config.server.bind_address())
        .await
        .wrap_err_with(|| format!("failed to bind {}", config.server.bind_address()))?;
    server::run_app(listener, state, &config.server).await?;

    db.close().await;
    tracing::info!("Database pool closed");
    Ok(())
}
