mod error;
mod events;
mod logging;
mod routes;
mod state;

use deckhand::load_or_default;
use tracing::{error, info};

use state::AppState;

/// Environment variable naming the config file; the first CLI argument also works.
const CONFIG_ENV: &str = "DECKHAND_CONFIG";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var(CONFIG_ENV)
        .ok()
        .or_else(|| std::env::args().nth(1));
    let config = load_or_default(config_path.as_deref())?;

    logging::init(&config.logging)?;
    info!("Starting deckhand server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        max_concurrent_jobs = config.max_concurrent_jobs,
        uploads = %config.upload_directory,
        outputs = %config.output_directory,
        documents = %config.documents_directory,
        naming_endpoint = config.naming.endpoint.as_deref().unwrap_or("none"),
        "Configuration loaded"
    );

    let state = AppState::from_config(&config)?;
    let app = routes::router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("Listening on {}", config.bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
