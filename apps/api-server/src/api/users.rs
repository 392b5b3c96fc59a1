//! Profile and review endpoints.

use std::sync::Arc;

use api_protocol::{ProfileView, RateUserRequest, UpdateProfileRequest};
use axum::{Extension, Json, extract::State, http::StatusCode};
use entities::{DEFAULT_USER_PHOTO, MAX_RATING, MIN_RATING, Review};
use sortie_store::SortieStore;

use crate::error::{ServerError, ServerResult};
use crate::extract::{IdPath, ValidJson};
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;
use crate::validation;

/// Returns a public profile.
pub async fn get_user<S: SortieStore>(
    State(state): State<Arc<AppState<S>>>,
    IdPath(id): IdPath,
) -> ServerResult<Json<ProfileView>> {
    let user = state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| ServerError::NotFound("User not found".to_string()))?;

    Ok(Json(ProfileView::from(&user)))
}

/// Updates the caller's username, bio or photo.
///
/// An empty bio clears it; an empty photo restores the default one.
pub async fn update_profile<S: SortieStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
    ValidJson(request): ValidJson<UpdateProfileRequest>,
) -> ServerResult<Json<ProfileView>> {
    let mut user = state
        .store
        .get_user(caller.id)
        .await?
        .ok_or_else(|| ServerError::NotFound("User not found".to_string()))?;

    if let Some(username) = request.username {
        user.username = validation::username(Some(username))?;
    }
    if let Some(bio) = request.bio {
        let bio = bio.trim();
        user.bio = (!bio.is_empty()).then(|| bio.to_string());
    }
    if let Some(photo) = request.photo {
        user.photo = if photo.trim().is_empty() {
            DEFAULT_USER_PHOTO.to_string()
        } else {
            validation::http_url(&photo, "photo")?
        };
    }

    let user = state.store.update_user(user).await?;

    tracing::info!(user_id = %user.id, "Profile updated");

    Ok(Json(ProfileView::from(&user)))
}

/// Rates another user.
pub async fn rate_user<S: SortieStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
    IdPath(target): IdPath,
    ValidJson(request): ValidJson<RateUserRequest>,
) -> ServerResult<(StatusCode, Json<ProfileView>)> {
    let rating = request
        .rating
        .filter(|r| Review::is_valid_rating(*r))
        .and_then(|r| u8::try_from(r).ok())
        .ok_or_else(|| {
            ServerError::InvalidRequest(format!(
                "rating must be an integer between {MIN_RATING} and {MAX_RATING}"
            ))
        })?;

    if target == caller.id {
        return Err(ServerError::InvalidRequest(
            "You cannot rate yourself".to_string(),
        ));
    }

    let user = state
        .store
        .add_review(target, Review::new(caller.id, rating))
        .await?;

    tracing::info!(user_id = %target, reviewer_id = %caller.id, rating, "User rated");

    Ok((StatusCode::CREATED, Json(ProfileView::from(&user))))
}
