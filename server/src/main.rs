use axum::{http::Method, routing::get, Router};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod bridge;
mod config;
mod content;
mod disk;
mod error;
mod listing;
mod paths;

use config::{Args, ServerConfig};

/// Configuration shared by every handler. Never mutated after startup.
pub type SharedState = Arc<ServerConfig>;

// -----------------------------------------------------------------------------
// Main entry
// -----------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ServerConfig::from_args(Args::parse())?;
    let addr = config.addr;

    info!("Serving files from: {}", config.root.display());
    info!("Converter: {}", config.helpers.converter);
    info!("Streamer: {}", config.helpers.streamer);
    info!("Opener: {}", config.helpers.opener);

    let state: SharedState = Arc::new(config);
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    info!("xplore listening on http://{}", addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// API routes, with static assets as the fallback.
pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(Any);

    Router::new()
        .route("/api/disk-usage", get(disk::disk_usage))
        .route("/api/files", get(listing::list_files))
        .route("/api/file", get(content::get_file))
        .fallback_service(ServeDir::new(&state.static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
