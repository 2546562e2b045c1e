//! Cloudinary image hosting.
//!
//! Product images are uploaded either directly from the admin browser (using
//! parameters signed here) or through the backend. Signatures are SHA-256
//! over the alphabetically sorted parameters followed by the API secret.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::instrument;

use super::ports::IntegrationError;
use crate::config::CloudinaryConfig;

const SERVICE: &str = "Cloudinary";
const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Parameters a browser needs for a signed direct upload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SignedUpload {
    pub cloud_name: String,
    pub api_key: String,
    pub folder: String,
    pub timestamp: i64,
    pub signature: String,
    pub upload_url: String,
}

/// An uploaded image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadedImage {
    pub public_id: String,
    pub secure_url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Cloudinary upload API client.
#[derive(Clone)]
pub struct CloudinaryClient {
    client: reqwest::Client,
    api_base: String,
    cloud_name: String,
    api_key: String,
    api_secret: SecretString,
}

impl CloudinaryClient {
    /// Create a client for the configured account.
    #[must_use]
    pub fn new(config: &CloudinaryConfig) -> Self {
        Self::with_api_base(config, DEFAULT_API_BASE)
    }

    /// Create a client against a different API host.
    #[must_use]
    pub fn with_api_base(config: &CloudinaryConfig, api_base: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_owned(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{action}", self.api_base, self.cloud_name)
    }

    /// Sign a parameter set: `k1=v1&k2=v2` in key order, then the secret.
    fn sign(&self, params: &BTreeMap<&str, String>) -> String {
        let to_sign = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.api_secret.expose_secret().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Parameters for a direct browser upload into `folder`.
    #[must_use]
    pub fn signed_params(&self, folder: &str, now: DateTime<Utc>) -> SignedUpload {
        let timestamp = now.timestamp();
        let params = BTreeMap::from([
            ("folder", folder.to_owned()),
            ("timestamp", timestamp.to_string()),
        ]);

        SignedUpload {
            cloud_name: self.cloud_name.clone(),
            api_key: self.api_key.clone(),
            folder: folder.to_owned(),
            timestamp,
            signature: self.sign(&params),
            upload_url: self.endpoint("upload"),
        }
    }

    /// Upload an image through the backend.
    ///
    /// # Errors
    ///
    /// Returns `IntegrationError` if Cloudinary rejects the upload or cannot
    /// be reached.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        folder: &str,
    ) -> Result<UploadedImage, IntegrationError> {
        let signed = self.signed_params(folder, Utc::now());
        let form = Form::new()
            .text("api_key", signed.api_key)
            .text("timestamp", signed.timestamp.to_string())
            .text("folder", signed.folder)
            .text("signature", signed.signature)
            .part("file", Part::bytes(bytes).file_name(file_name.to_owned()));

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| IntegrationError::Parse(e.to_string()))
    }

    /// Delete an image. Returns `false` if Cloudinary did not know it.
    ///
    /// # Errors
    ///
    /// Returns `IntegrationError` if the request fails.
    #[instrument(skip(self))]
    pub async fn destroy(&self, public_id: &str) -> Result<bool, IntegrationError> {
        let timestamp = Utc::now().timestamp();
        let params = BTreeMap::from([
            ("public_id", public_id.to_owned()),
            ("timestamp", timestamp.to_string()),
        ]);
        let signature = self.sign(&params);

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&[
                ("public_id", public_id.to_owned()),
                ("timestamp", timestamp.to_string()),
                ("api_key", self.api_key.clone()),
                ("signature", signature),
            ])
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: DestroyResponse = response
            .json()
            .await
            .map_err(|e| IntegrationError::Parse(e.to_string()))?;
        match body.result.as_str() {
            "ok" => Ok(true),
            "not found" => Ok(false),
            other => Err(IntegrationError::Parse(format!("unexpected destroy result: {other}"))),
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, IntegrationError> {
    let status = response.status();
    if status.as_u16() == 401 {
        return Err(IntegrationError::Unauthorized(SERVICE));
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(IntegrationError::Api {
            service: SERVICE,
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config() -> CloudinaryConfig {
        CloudinaryConfig {
            cloud_name: "balance".to_owned(),
            api_key: "1234".to_owned(),
            api_secret: SecretString::from("abcd"),
        }
    }

    #[test]
    fn test_signature_is_sha256_of_sorted_params_and_secret() {
        let client = CloudinaryClient::new(&config());
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let signed = client.signed_params("products", now);

        let expected = hex::encode(Sha256::digest(b"folder=products&timestamp=1700000000abcd"));
        assert_eq!(signed.signature, expected);
        assert_eq!(signed.timestamp, 1_700_000_000);
        assert_eq!(
            signed.upload_url,
            "https://api.cloudinary.com/v1_1/balance/image/upload"
        );
    }

    #[tokio::test]
    async fn test_upload_parses_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/balance/image/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "public_id": "products/rose",
                "secure_url": "https://res.cloudinary.com/balance/image/upload/products/rose.jpg",
                "width": 800,
                "height": 600,
                "format": "jpg"
            })))
            .mount(&server)
            .await;

        let client = CloudinaryClient::with_api_base(&config(), &server.uri());
        let image = client
            .upload(vec![0xFF, 0xD8, 0xFF], "rose.jpg", "products")
            .await
            .unwrap();
        assert_eq!(image.public_id, "products/rose");
        assert_eq!(image.width, Some(800));
    }

    #[tokio::test]
    async fn test_destroy_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/balance/image/destroy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "not found"})))
            .mount(&server)
            .await;

        let client = CloudinaryClient::with_api_base(&config(), &server.uri());
        assert!(!client.destroy("products/missing").await.unwrap());
    }
}
