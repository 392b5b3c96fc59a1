//! Authentication middleware.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use entities::User;
use sortie_store::SortieStore;
use uuid::Uuid;

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Authenticated user information.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// User ID.
    pub id: Uuid,
    /// Current username.
    pub username: String,
}

impl From<&User> for AuthenticatedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

/// Extracts the JWT token from the Authorization header.
fn extract_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware.
///
/// Validates the bearer token, loads the user it names and stores it in the
/// request extensions. Tokens of deleted users are rejected.
pub async fn auth_middleware<S: SortieStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    mut request: Request,
    next: Next,
) -> ServerResult<Response> {
    let Some(token) = extract_token(&request) else {
        tracing::debug!(path = %request.uri().path(), "Missing bearer token");
        return Err(ServerError::AuthenticationRequired);
    };

    let claims = state.jwt_manager.validate_token(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected token");
        e
    })?;
    let user_id = claims.user_id()?;

    let Some(user) = state.store.get_user(user_id).await? else {
        tracing::warn!(user_id = %user_id, "Token for unknown user");
        return Err(ServerError::AuthenticationRequired);
    };

    request
        .extensions_mut()
        .insert(AuthenticatedUser::from(&user));

    Ok(next.run(request).await)
}
