//! API endpoints.

pub mod auth;
pub mod conversations;
pub mod events;
pub mod places;
pub mod uploads;
pub mod users;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use sortie_store::SortieStore;

use crate::middleware::auth_middleware;
use crate::state::AppState;

/// Creates the API router with all endpoints.
///
/// Routes in the protected group run behind [`auth_middleware`].
pub fn create_router<S: SortieStore + 'static>(
    state: Arc<AppState<S>>,
) -> Router<Arc<AppState<S>>> {
    let upload_limit = state.config.upload_max_bytes;

    let public = Router::new()
        // Auth endpoints
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        // User endpoints
        .route("/users/:id", get(users::get_user))
        // Event endpoints
        .route("/events", get(events::list_events))
        .route("/events/:id", get(events::get_event))
        // Integration endpoints
        .route("/places/restaurants", get(places::restaurants_near))
        // Health check
        .route("/health", get(health_check));

    let protected = Router::new()
        .route("/auth/profile", get(auth::profile))
        .route("/auth/password", put(auth::change_password))
        .route("/users/me", put(users::update_profile))
        .route("/users/:id/reviews", post(users::rate_user))
        .route("/events", post(events::create_event))
        .route(
            "/events/:id",
            put(events::update_event).delete(events::delete_event),
        )
        .route("/events/:id/join", post(events::join_event))
        .route("/events/:id/leave", post(events::leave_event))
        .route(
            "/conversations/create",
            post(conversations::create_conversation),
        )
        .route(
            "/conversations/my-conversations",
            get(conversations::list_my_conversations),
        )
        .route("/conversations/:id", get(conversations::get_conversation))
        .route(
            "/conversations/:id/message",
            post(conversations::post_message),
        )
        .route(
            "/upload",
            post(uploads::upload_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route_layer(from_fn_with_state(state, auth_middleware::<S>));

    public.merge(protected)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
