use std::sync::Arc;
use std::time::Instant;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_uploader::{
    api,
    config::Config,
    pipeline::{RemoteBackend, UploadPipeline},
    storage::{Cloudinary, DiskStore},
    AppState,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "image-uploader starting");

    // Load configuration
    let config = Config::load()?;

    // Local disk is always wired up, if only as the fallback target.
    let disk = DiskStore::new(&config.storage.uploads_dir, &config.server.public_base_url)?;
    info!("Uploads directory: {}", config.storage.uploads_dir);

    // The remote media host exists only when credentials are configured.
    let remote = match &config.storage.remote {
        Some(remote_config) => {
            let host = Cloudinary::new(remote_config)?;
            info!(
                cloud_name = %remote_config.cloud_name,
                folder = %remote_config.folder,
                "Using Cloudinary storage backend"
            );
            Some(RemoteBackend {
                host: Arc::new(host),
                folder: remote_config.folder.clone(),
            })
        }
        None => {
            info!("Cloudinary not configured, storing uploads on local disk");
            None
        }
    };

    let pipeline = UploadPipeline::new(disk, remote);

    // Create shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        pipeline,
        started_at: Instant::now(),
    });

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!("Listening on: {}", config.bind_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
