//! Registration, login and credential endpoints.

use std::sync::Arc;

use api_protocol::{
    AuthResponse, ChangePasswordRequest, LoginRequest, ProfileView, RegisterRequest,
    StatusMessageResponse,
};
use axum::{Extension, Json, extract::State, http::StatusCode};
use entities::User;
use sortie_store::SortieStore;

use crate::error::{ServerError, ServerResult};
use crate::extract::ValidJson;
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;
use crate::validation;

/// Same message for unknown emails and wrong passwords.
const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Hashes a password off the async runtime.
async fn hash_password<S: SortieStore + 'static>(
    state: &Arc<AppState<S>>,
    password: String,
) -> ServerResult<String> {
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || state.password_hasher.hash(&password))
        .await
        .map_err(|e| ServerError::Internal(format!("password hashing task failed: {e}")))?
        .map_err(ServerError::from)
}

/// Verifies a password off the async runtime.
async fn verify_password<S: SortieStore + 'static>(
    state: &Arc<AppState<S>>,
    password: String,
    hash: String,
) -> ServerResult<bool> {
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || state.password_hasher.verify(&password, &hash))
        .await
        .map_err(|e| ServerError::Internal(format!("password verification task failed: {e}")))?
        .map_err(ServerError::from)
}

fn auth_response<S: SortieStore>(state: &AppState<S>, user: User) -> ServerResult<AuthResponse> {
    let token = state
        .jwt_manager
        .generate_token(user.id, user.username.clone())?;

    Ok(AuthResponse {
        token,
        user_id: user.id,
        username: user.username,
    })
}

/// Registers a new account and signs it in.
pub async fn register<S: SortieStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ValidJson(request): ValidJson<RegisterRequest>,
) -> ServerResult<(StatusCode, Json<AuthResponse>)> {
    let username = validation::username(request.username)?;
    let email = validation::email(request.email)?;
    let password = validation::password(request.password, "password")?;

    let password_hash = hash_password(&state, password).await?;
    let user = state
        .store
        .create_user(User::new(username, email, password_hash))
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((StatusCode::CREATED, Json(auth_response(&state, user)?)))
}

/// Exchanges an email and password for a token.
pub async fn login<S: SortieStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ValidJson(request): ValidJson<LoginRequest>,
) -> ServerResult<Json<AuthResponse>> {
    let email = validation::required_text(request.email, "email")?.to_lowercase();
    let password = request
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ServerError::InvalidRequest("password is required".to_string()))?;

    let Some(user) = state.store.get_user_by_email(&email).await? else {
        tracing::debug!("Login for unknown email");
        return Err(ServerError::InvalidRequest(INVALID_CREDENTIALS.to_string()));
    };

    if !verify_password(&state, password, user.password_hash.clone()).await? {
        tracing::debug!(user_id = %user.id, "Login with wrong password");
        return Err(ServerError::InvalidRequest(INVALID_CREDENTIALS.to_string()));
    }

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(auth_response(&state, user)?))
}

/// Returns the profile of the caller.
pub async fn profile<S: SortieStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ServerResult<Json<ProfileView>> {
    let user = state
        .store
        .get_user(user.id)
        .await?
        .ok_or_else(|| ServerError::NotFound("User not found".to_string()))?;

    Ok(Json(ProfileView::from(&user)))
}

/// Changes the caller's password after checking the current one.
pub async fn change_password<S: SortieStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidJson(request): ValidJson<ChangePasswordRequest>,
) -> ServerResult<Json<StatusMessageResponse>> {
    let current = request
        .current_password
        .ok_or_else(|| ServerError::InvalidRequest("current_password is required".to_string()))?;
    let new_password = validation::password(request.new_password, "new_password")?;

    let mut stored = state
        .store
        .get_user(user.id)
        .await?
        .ok_or_else(|| ServerError::NotFound("User not found".to_string()))?;

    if !verify_password(&state, current, stored.password_hash.clone()).await? {
        return Err(ServerError::InvalidRequest(
            "Current password is incorrect".to_string(),
        ));
    }

    stored.password_hash = hash_password(&state, new_password).await?;
    state.store.update_user(stored).await?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(Json(StatusMessageResponse::new("Password updated")))
}
