use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::{IntegrationError, IntegrationResult, REQUEST_TIMEOUT, http_client};
use crate::config::CloudinaryConfig;

/// Cloudinary API base URL
const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com";

/// Folder all uploads land in
const UPLOAD_FOLDER: &str = "city_connect";

/// A file stored by the media host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    /// Public HTTPS URL.
    pub url: String,
    /// Provider-side identifier.
    pub public_id: String,
}

/// Image hosting.
#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn upload_image(
        &self,
        data: Vec<u8>,
        content_type: &str,
    ) -> IntegrationResult<UploadedMedia>;
}

#[derive(Debug, Deserialize)]
struct UploadResult {
    secure_url: String,
    public_id: String,
}

/// Signed-upload client for Cloudinary
pub struct CloudinaryClient {
    client: Client,
    config: CloudinaryConfig,
    base_url: String,
}

impl CloudinaryClient {
    /// Creates a new client
    pub fn new(config: CloudinaryConfig) -> IntegrationResult<Self> {
        Ok(Self {
            client: http_client(REQUEST_TIMEOUT)?,
            config,
            base_url: CLOUDINARY_API_BASE.to_string(),
        })
    }

    /// Points the client at another host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Signs the upload parameters: sorted `key=value` pairs joined by `&`,
    /// followed by the API secret, hashed with SHA-256.
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut sorted = params.to_vec();
        sorted.sort_by_key(|(key, _)| *key);
        let to_sign = sorted
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");

        let digest = Sha256::digest(format!("{to_sign}{}", self.config.api_secret).as_bytes());
        format!("{digest:x}")
    }
}

#[async_trait]
impl MediaHost for CloudinaryClient {
    async fn upload_image(
        &self,
        data: Vec<u8>,
        content_type: &str,
    ) -> IntegrationResult<UploadedMedia> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[("folder", UPLOAD_FOLDER), ("timestamp", &timestamp)]);
        let file = format!("data:{content_type};base64,{}", STANDARD.encode(&data));

        let response = self
            .client
            .post(format!(
                "{}/v1_1/{}/image/upload",
                self.base_url, self.config.cloud_name
            ))
            .form(&[
                ("file", file.as_str()),
                ("api_key", self.config.api_key.as_str()),
                ("timestamp", timestamp.as_str()),
                ("folder", UPLOAD_FOLDER),
                ("signature", signature.as_str()),
                ("signature_algorithm", "sha256"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IntegrationError::Provider {
                service: "cloudinary",
                status: status.as_u16(),
                message,
            });
        }

        let result: UploadResult =
            response
                .json()
                .await
                .map_err(|e| IntegrationError::InvalidResponse {
                    service: "cloudinary",
                    message: e.to_string(),
                })?;

        tracing::debug!(
            public_id = %result.public_id,
            bytes = data.len(),
            "Cloudinary upload finished"
        );

        Ok(UploadedMedia {
            url: result.secure_url,
            public_id: result.public_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::{Form, Json, Router, routing::post};

    use super::*;
    use crate::services::spawn_stub;

    fn client() -> CloudinaryClient {
        CloudinaryClient::new(CloudinaryConfig {
            cloud_name: "demo".to_string(),
            api_key: "1234".to_string(),
            api_secret: "abcd".to_string(),
        })
        .unwrap()
    }

    async fn stub_upload(Form(form): Form<HashMap<String, String>>) -> Json<serde_json::Value> {
        let field = |name: &str| form.get(name).cloned().unwrap_or_default();
        Json(serde_json::json!({
            "secure_url": field("file"),
            "public_id": format!("{}|{}|{}", field("folder"), field("timestamp"), field("signature")),
        }))
    }

    #[tokio::test]
    async fn test_upload_sends_signed_data_uri() {
        let base_url =
            spawn_stub(Router::new().route("/v1_1/demo/image/upload", post(stub_upload))).await;
        let client = client().with_base_url(base_url);

        let uploaded = client
            .upload_image(b"hello".to_vec(), "image/png")
            .await
            .unwrap();

        assert_eq!(uploaded.url, "data:image/png;base64,aGVsbG8=");
        let parts: Vec<&str> = uploaded.public_id.split('|').collect();
        assert_eq!(parts[0], UPLOAD_FOLDER);
        assert_eq!(
            parts[2],
            client.sign(&[("folder", UPLOAD_FOLDER), ("timestamp", parts[1])])
        );
    }

    #[tokio::test]
    async fn test_upload_reports_provider_status() {
        let err = client()
            .with_base_url(spawn_stub(Router::new()).await)
            .upload_image(b"hello".to_vec(), "image/png")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            IntegrationError::Provider {
                service: "cloudinary",
                status: 404,
                ..
            }
        ));
    }

    #[test]
    fn test_signature_is_order_independent() {
        let client = client();

        let a = client.sign(&[("timestamp", "1315060510"), ("folder", "city_connect")]);
        let b = client.sign(&[("folder", "city_connect"), ("timestamp", "1315060510")]);

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_signature_matches_sha256_of_payload() {
        let expected = format!(
            "{:x}",
            Sha256::digest(b"folder=city_connect&timestamp=1315060510abcd")
        );

        let signature = client().sign(&[("folder", "city_connect"), ("timestamp", "1315060510")]);

        assert_eq!(signature, expected);
    }
}
