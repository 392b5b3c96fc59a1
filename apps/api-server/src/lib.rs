//! Sortie API server
//!
//! HTTP/JSON backend for organizing local outings: accounts and profiles,
//! events with capacity, and the conversations attached to each event.

pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod services;
pub mod state;
pub mod validation;
pub mod views;

use std::sync::Arc;

use axum::Router;
use sortie_store::SortieStore;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::state::AppState;

/// Creates the application router with all routes configured.
pub fn create_app<S: SortieStore + 'static>(state: Arc<AppState<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api::create_router(Arc::clone(&state))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Creates the application state with the given configuration and store.
pub fn create_state<S: SortieStore>(config: Config, store: S) -> AppState<S> {
    AppState::new(config, store)
}

/// Initializes tracing with the given log level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
