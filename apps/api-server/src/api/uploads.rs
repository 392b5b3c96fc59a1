//! Image upload endpoint.

use std::sync::Arc;

use api_protocol::UploadResponse;
use axum::{
    Extension, Json,
    extract::{Multipart, State},
};
use sortie_store::SortieStore;

use crate::error::{ServerError, ServerResult};
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;

/// Multipart field carrying the image.
const FILE_FIELD: &str = "file";

/// Uploads an image to the media host and returns its public URL.
pub async fn upload_image<S: SortieStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
    mut multipart: Multipart,
) -> ServerResult<Json<UploadResponse>> {
    let media = state.media.clone().ok_or_else(|| {
        ServerError::ServiceUnavailable("Image upload is not configured".to_string())
    })?;

    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::InvalidRequest(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
        file = Some((data, content_type));
        break;
    }

    let (data, content_type) = file
        .filter(|(data, _)| !data.is_empty())
        .ok_or_else(|| ServerError::InvalidRequest("No file uploaded".to_string()))?;
    if !content_type.starts_with("image/") {
        return Err(ServerError::InvalidRequest(format!(
            "Unsupported file type '{content_type}'"
        )));
    }

    let uploaded = media.upload_image(data.to_vec(), &content_type).await?;

    tracing::info!(user_id = %caller.id, public_id = %uploaded.public_id, "Image uploaded");

    Ok(Json(UploadResponse {
        url: uploaded.url,
        public_id: uploaded.public_id,
    }))
}
