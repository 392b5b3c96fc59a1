//! Server error types.

use api_protocol::{ErrorBody, error_codes};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sortie_store::StoreError;

use crate::services::IntegrationError;

/// Message returned for every 5xx caused by an internal failure.
const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Invalid request parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The request conflicts with the current state (duplicate, full, ...).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authentication required.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Permission denied.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Storage failure.
    #[error("Database error: {0}")]
    Database(StoreError),

    /// Authentication error.
    #[error("Auth error: {0}")]
    Auth(#[from] auth::AuthError),

    /// A third-party service failed.
    #[error("Upstream error: {0}")]
    Upstream(#[from] IntegrationError),

    /// A required integration is not configured.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity_type, .. } => {
                ServerError::NotFound(format!("{entity_type} not found"))
            }
            StoreError::AlreadyExists { entity_type, field } => {
                ServerError::Conflict(format!("{entity_type} with this {field} already exists"))
            }
            StoreError::EventFull { .. } => ServerError::Conflict("Event is full".to_string()),
            StoreError::AlreadyParticipant { .. } => {
                ServerError::Conflict("You are already a participant of this event".to_string())
            }
            StoreError::NotParticipant {
                entity_type: "Conversation",
                ..
            } => ServerError::PermissionDenied(
                "You are not a participant of this conversation".to_string(),
            ),
            StoreError::NotParticipant { .. } => {
                ServerError::Conflict("You are not a participant of this event".to_string())
            }
            StoreError::CapacityTooLow {
                capacity,
                participants,
            } => ServerError::Conflict(format!(
                "max_participants ({capacity}) cannot be lower than the current number of \
                 participants ({participants})"
            )),
            other => ServerError::Database(other),
        }
    }
}

impl ServerError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ServerError::InvalidRequest(_) => {
                (StatusCode::BAD_REQUEST, error_codes::INVALID_REQUEST)
            }
            ServerError::Conflict(_) => (StatusCode::BAD_REQUEST, error_codes::CONFLICT),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, error_codes::NOT_FOUND),
            ServerError::Auth(e) if e.is_server_fault() => {
                (StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL)
            }
            ServerError::AuthenticationRequired | ServerError::Auth(_) => {
                (StatusCode::UNAUTHORIZED, error_codes::UNAUTHENTICATED)
            }
            ServerError::PermissionDenied(_) => {
                (StatusCode::FORBIDDEN, error_codes::PERMISSION_DENIED)
            }
            ServerError::Upstream(_) => (StatusCode::BAD_GATEWAY, error_codes::UPSTREAM_ERROR),
            ServerError::ServiceUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                error_codes::SERVICE_UNAVAILABLE,
            ),
            ServerError::Database(_) | ServerError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL)
            }
        }
    }

    fn client_message(&self) -> String {
        match self {
            ServerError::InvalidRequest(msg)
            | ServerError::Conflict(msg)
            | ServerError::NotFound(msg)
            | ServerError::PermissionDenied(msg)
            | ServerError::ServiceUnavailable(msg) => msg.clone(),
            ServerError::AuthenticationRequired => "Authentication required".to_string(),
            ServerError::Auth(e) if e.is_server_fault() => INTERNAL_ERROR_MESSAGE.to_string(),
            ServerError::Auth(auth::AuthError::TokenExpired) => "Token expired".to_string(),
            ServerError::Auth(_) => "Invalid token".to_string(),
            ServerError::Upstream(_) => "External service request failed".to_string(),
            ServerError::Database(_) | ServerError::Internal(_) => {
                INTERNAL_ERROR_MESSAGE.to_string()
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        match &self {
            ServerError::Upstream(_) | ServerError::ServiceUnavailable(_) => {
                tracing::warn!(error = %self, "Integration unavailable");
            }
            _ if status.is_server_error() => tracing::error!(error = %self, "Request failed"),
            _ => tracing::debug!(error = %self, status = %status, "Request rejected"),
        }

        (status, Json(ErrorBody::new(code, self.client_message()))).into_response()
    }
}

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
