//! Third-party integrations.

pub mod media;
pub mod places;

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

/// Request timeout applied to every integration call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{service} returned {status}: {message}")]
    Provider {
        service: &'static str,
        status: u16,
        message: String,
    },
    #[error("Unexpected response from {service}: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },
}

pub type IntegrationResult<T> = Result<T, IntegrationError>;

fn http_client(timeout: Duration) -> IntegrationResult<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

pub use media::{CloudinaryClient, MediaHost, UploadedMedia};
pub use places::{FoursquareClient, PlacesProvider};

/// Serves `router` on a random local port and returns its base URL.
#[cfg(test)]
pub(crate) async fn spawn_stub(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
}
