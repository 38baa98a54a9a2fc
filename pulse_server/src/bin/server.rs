//! Pulse HTTP Server Binary
//!
//! # Environment Variables
//!
//! - `PULSE_CONFIG`: optional TOML file with the settings below in lowercase
//! - `BASE_IMAGE_PATH`, `BUCKET_NAME`: required
//! - `HOST` (default 0.0.0.0), `PORT` (default 8080)
//! - `STORAGE_BACKEND`: gcs, local or memory
//! - `RUST_LOG`: log filter, falls back to `LOG_LEVEL`

use tracing::info;
use tracing_subscriber::EnvFilter;

use pulse_server::{create_router, AppState, ServiceConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::load()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting Pulse HTTP Server");
    info!(
        model = ?config.forecast_model,
        backend = ?config.storage_backend,
        timeout_secs = config.training_timeout_secs,
        "configuration loaded"
    );

    let addr = config.bind_addr();
    let state = AppState::from_config(config)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
