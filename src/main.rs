use anyhow::{Context, Result};
use axum::Router;
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod views;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config (missing connection settings are fatal) ---
    let cfg = config::AppConfig::from_env_and_args().context("loading configuration")?;

    tracing::info!("Starting bucket-browser with config: {:?}", cfg);

    // --- Initialize store client ---
    let store = services::store_client::StoreClient::from_config(&cfg.store)
        .map_err(errors::ConfigError::Store)
        .context("initializing object store client")?;

    // --- Initialize core service ---
    let cfg = Arc::new(cfg);
    let browser = services::BrowserService::new(cfg.clone(), store);

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(browser);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!(
        bucket = %cfg.store.bucket,
        "Server listening on http://{}",
        listener.local_addr()?
    );
    axum::serve(listener, app).await?;

    Ok(())
}
