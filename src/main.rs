use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use updown_core::{
    CoreConfig, DEFAULT_REST_ADDR, FileService, FileSystemStorage, MAX_UPLOAD_BYTES_ENV,
    REST_ADDR_ENV, RESET_ON_STARTUP_ENV, STORAGE_LOCATION_ENV,
};

/// Main entry point for the UpDown server
///
/// Resolves configuration from the environment (and a `.env` file if present), prepares the
/// storage directory and serves the REST API until interrupted.
///
/// # Environment Variables
/// - `UPDOWN_STORAGE_LOCATION`: Storage directory (default: "upload-dir")
/// - `UPDOWN_MAX_UPLOAD_BYTES`: Request body limit in bytes (default: 64 MiB)
/// - `UPDOWN_RESET_ON_STARTUP`: Wipe stored files before serving (default: false)
/// - `UPDOWN_REST_ADDR`: REST server address (default: "0.0.0.0:8080")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - configuration values are invalid,
/// - the storage directory cannot be prepared,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("updown=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = CoreConfig::from_env_values(
        std::env::var(STORAGE_LOCATION_ENV).ok(),
        std::env::var(MAX_UPLOAD_BYTES_ENV).ok(),
        std::env::var(RESET_ON_STARTUP_ENV).ok(),
    )?;
    let rest_addr = std::env::var(REST_ADDR_ENV).unwrap_or_else(|_| DEFAULT_REST_ADDR.into());

    let storage = FileSystemStorage::new(cfg.storage_location())?;
    tracing::info!("++ Storage root {}", storage.root().display());

    let files = FileService::new(Arc::new(storage));
    files.prepare(cfg.reset_on_startup())?;

    let app = api_rest::router(files, cfg.max_upload_bytes());

    tracing::info!("++ Starting UpDown REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("-- Shutting down");
        })
        .await?;

    Ok(())
}
