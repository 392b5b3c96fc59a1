//! Sortie API server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use api_server::{
    config::Config,
    create_app, create_state, init_tracing,
    services::{CloudinaryClient, FoursquareClient},
    state::AppState,
};
use sortie_store::{MemoryStore, SortieStore, SqliteStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    init_tracing(&config.log_level);

    tracing::info!(
        leave_policy = ?config.leave_policy,
        places = config.foursquare_api_key.is_some(),
        uploads = config.cloudinary.is_some(),
        "Starting Sortie API server"
    );

    match config.database_url.clone() {
        Some(url) => {
            let store = SqliteStore::connect(&url, config.db_max_connections).await?;
            tracing::info!(database_url = %url, "Using SQLite store");
            serve(config, store).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set, data will not survive a restart");
            serve(config, MemoryStore::new()).await
        }
    }
}

async fn serve<S: SortieStore + 'static>(config: Config, store: S) -> anyhow::Result<()> {
    let addr: SocketAddr = config.server_addr().parse()?;

    let mut state: AppState<S> = create_state(config.clone(), store);
    if let Some(api_key) = &config.foursquare_api_key {
        state = state.with_places(Arc::new(FoursquareClient::new(api_key.clone())?));
    }
    if let Some(cloudinary) = &config.cloudinary {
        state = state.with_media(Arc::new(CloudinaryClient::new(cloudinary.clone())?));
    }

    let app = create_app(Arc::new(state));

    tracing::info!(addr = %addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
