//! Request extractors that report failures in the API error format.

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, Request, rejection::JsonRejection},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::ServerError;

/// JSON body extractor. Malformed bodies become `ServerError::InvalidRequest`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ServerError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            ServerError::InvalidRequest("Expected a JSON request body".to_string())
        }
        other => ServerError::InvalidRequest(other.body_text()),
    }
}

/// Query string extractor with the same error mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidQuery<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| Self(value))
            .map_err(|rejection| ServerError::InvalidRequest(rejection.body_text()))
    }
}

/// Single `:id` path segment parsed as a UUID.
#[derive(Debug, Clone, Copy)]
pub struct IdPath(pub Uuid);

#[axum::async_trait]
impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ServerError::InvalidRequest(rejection.body_text()))?;

        Uuid::parse_str(&raw)
            .map(Self)
            .map_err(|_| ServerError::InvalidRequest(format!("Invalid id '{raw}'")))
    }
}
