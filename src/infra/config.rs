//! For reading application configuration.
//!
//! Values are layered: built-in defaults, then an optional `config.toml`
//! in the working directory, then `APP_`-prefixed environment variables
//! (`APP_DATABASE__HOST=db` sets `database.host`).

use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use std::time::Duration;

/// Application configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to.
    pub address: String,
    /// Port to listen on.
    pub port: u16,
    /// Requests running longer than this are aborted.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// How long in-flight requests may drain after a shutdown signal.
    #[serde(with = "humantime_serde")]
    pub shutdown_grace_period: Duration,
    /// Maximum number of requests served concurrently, across all routes.
    pub concurrency_limit: usize,
}

impl ServerConfig {
    /// The `address:port` pair to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Database configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseConfig {
    /// The database username.
    pub username: String,
    /// The database password.
    pub password: String,
    /// The database host.
    pub host: String,
    /// The database port.
    pub port: u16,
    /// The database name.
    pub database_name: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
    /// How long to wait for a free connection.
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Duration,
    /// Whether to apply embedded migrations on startup.
    pub run_migrations: bool,
}

impl DatabaseConfig {
    /// Connection options for this database.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .username(&self.username)
            .password(&self.password)
            .host(&self.host)
            .port(self.port)
            .database(&self.database_name)
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct LoggingConfig {
    /// An [`tracing_subscriber::EnvFilter`] directive, overridden by `RUST_LOG`.
    pub filter: String,
    /// If set, JSON logs are also written to hourly files in this directory.
    pub directory: Option<String>,
}

/// Retrieve [`Config`] from defaults, `config.toml` and the environment.
#[tracing::instrument]
pub fn load_config() -> Result<Config, config::ConfigError> {
    config::Config::builder()
        .set_default("server.address", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("server.request_timeout", "10s")?
        .set_default("server.shutdown_grace_period", "5s")?
        .set_default("server.concurrency_limit", 500)?
        .set_default("database.username", "postgres")?
        .set_default("database.password", "")?
        .set_default("database.host", "localhost")?
        .set_default("database.port", 5432)?
        .set_default("database.database_name", "catalog")?
        .set_default("database.max_connections", 10)?
        .set_default("database.acquire_timeout", "5s")?
        .set_default("database.run_migrations", true)?
        .set_default("logging.filter", "info,item_catalog=debug,tower_http=debug")?
        .add_source(config::File::with_name("config").required(false))
        .add_source(
            config::Environment::with_prefix("app")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}
