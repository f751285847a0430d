use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kingfall::api::{self, AppState};
use kingfall::config::Config;
use kingfall::store::Store;
use kingfall::ws::Registry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    let options = SqliteConnectOptions::from_str(&config.database_url)
        .context("invalid database URL")?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("failed to connect to database")?;

    let store = Store::new(pool);
    store
        .init_schema()
        .await
        .context("failed to initialize database schema")?;

    let state = AppState { store, registry: Arc::new(Registry::new()) };
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("listening on {}", config.bind_addr);
    axum::serve(listener, api::router(state)).await?;
    Ok(())
}
