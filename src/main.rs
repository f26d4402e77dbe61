use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use scrap_pickup::api;
use scrap_pickup::auth::{CodeVerifier, DemoCodeVerifier};
use scrap_pickup::config::Config;
use scrap_pickup::engine::lifecycle::seed_demo_data;
use scrap_pickup::error::AppError;
use scrap_pickup::state::AppState;
use scrap_pickup::storage::{FileStorage, MemoryStorage, Storage};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let storage: Arc<dyn Storage> = match &config.data_dir {
        Some(dir) => {
            tracing::info!(data_dir = %dir.display(), "using file storage");
            Arc::new(FileStorage::open(dir.clone())?)
        }
        None => {
            tracing::warn!("DATA_DIR not set; state will be lost on exit");
            Arc::new(MemoryStorage::new())
        }
    };
    let verifier: Arc<dyn CodeVerifier> =
        Arc::new(DemoCodeVerifier::new(config.demo_otp_code.clone()));

    let app_state = AppState::new(storage, verifier, config.event_buffer_size)?;
    if config.seed_demo_data {
        seed_demo_data(&app_state)?;
    }
    let shared_state = Arc::new(app_state);

    let app = api::rest::router(shared_state);

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
