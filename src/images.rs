use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tracing::{debug, error};

use crate::config::CloudinaryConfig;
use crate::error::ApiError;

/// Seam over the image host so handlers and tests never depend on the real
/// upload endpoint.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload one in-memory file, returning a durable HTTPS URL.
    async fn upload(&self, body: Bytes, content_type: &str) -> Result<String, ApiError>;
}

const UPLOAD_FAILURE: &str = "No se pudo subir la imagen";

pub struct CloudinaryClient {
    http: reqwest::Client,
    api_base: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    upload_folder: String,
}

impl CloudinaryClient {
    pub fn new(config: &CloudinaryConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            upload_folder: config.upload_folder.clone(),
        }
    }

    /// Request signature: the signed params sorted by name, serialized as a
    /// query string, with the API secret appended; hex-encoded SHA-256.
    fn sign(&self, folder: &str, timestamp: i64) -> String {
        let to_sign = format!(
            "folder={}&timestamp={}{}",
            folder, timestamp, self.api_secret
        );
        hex::encode(Sha256::digest(to_sign.as_bytes()))
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[async_trait]
impl ImageHost for CloudinaryClient {
    async fn upload(&self, body: Bytes, content_type: &str) -> Result<String, ApiError> {
        let data_uri = format!("data:{};base64,{}", content_type, BASE64.encode(&body));
        let timestamp = OffsetDateTime::now_utc().unix_timestamp();
        let signature = self.sign(&self.upload_folder, timestamp);

        let params = [
            ("file", data_uri),
            ("folder", self.upload_folder.clone()),
            ("timestamp", timestamp.to_string()),
            ("api_key", self.api_key.clone()),
            ("signature", signature),
        ];

        let res = self
            .http
            .post(format!(
                "{}/v1_1/{}/image/upload",
                self.api_base, self.cloud_name
            ))
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "image upload request failed");
                ApiError::Upstream(UPLOAD_FAILURE.to_string())
            })?;

        let status = res.status();
        if !status.is_success() {
            error!(%status, "image host rejected upload");
            return Err(ApiError::Upstream(UPLOAD_FAILURE.to_string()));
        }

        let parsed: UploadResponse = res.json().await.map_err(|e| {
            error!(error = %e, "malformed upload response");
            ApiError::Upstream(UPLOAD_FAILURE.to_string())
        })?;

        debug!(url = %parsed.secure_url, "image uploaded");
        Ok(parsed.secure_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_client(base: &str) -> CloudinaryClient {
        CloudinaryClient::new(&CloudinaryConfig {
            cloud_name: "demo".into(),
            api_key: "key123".into(),
            api_secret: "secreto".into(),
            api_base: base.into(),
            upload_folder: "perfiles".into(),
        })
    }

    #[tokio::test]
    async fn upload_returns_secure_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1_1/demo/image/upload"))
            .and(body_string_contains("folder=perfiles"))
            .and(body_string_contains("api_key=key123"))
            // the file param carries a data URI ("," form-encodes to %2C)
            .and(body_string_contains("data%3Aimage%2Fpng%3Bbase64%2C"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "secure_url": "https://res.cloudinary.com/demo/image/upload/v1/perfiles/abc.png"
            })))
            .mount(&server)
            .await;

        let client = make_client(&server.uri());
        let url = client
            .upload(Bytes::from_static(b"\x89PNG"), "image/png")
            .await
            .unwrap();
        assert_eq!(
            url,
            "https://res.cloudinary.com/demo/image/upload/v1/perfiles/abc.png"
        );
    }

    #[tokio::test]
    async fn upload_failure_surfaces_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1_1/demo/image/upload"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Invalid Signature"}
            })))
            .mount(&server)
            .await;

        let client = make_client(&server.uri());
        let err = client
            .upload(Bytes::from_static(b"data"), "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Upstream(_)));
    }

    #[test]
    fn signature_is_hex_sha256_and_deterministic() {
        let client = make_client("http://fake.local");
        let a = client.sign("perfiles", 1700000000);
        let b = client.sign("perfiles", 1700000000);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, client.sign("perfiles", 1700000001));
    }
}
