//! Service account key material.

use std::path::PathBuf;

use base64::Engine;
use serde::Deserialize;

use super::GoogleError;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Where the service account JSON comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Path to a key file (`GOOGLE_APPLICATION_CREDENTIALS`).
    File(PathBuf),
    /// The JSON document itself.
    Json(String),
    /// The JSON document, base64-encoded.
    Base64(String),
}

/// The fields of a service account key the JWT grant needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self, GoogleError> {
        let key: Self = serde_json::from_str(raw)
            .map_err(|e| GoogleError::Credentials(format!("invalid service account JSON: {}", e)))?;
        if key.client_email.trim().is_empty() || key.private_key.trim().is_empty() {
            return Err(GoogleError::Credentials(
                "service account JSON lacks client_email or private_key".to_string(),
            ));
        }
        Ok(key)
    }

    pub async fn load(source: &CredentialSource) -> Result<Self, GoogleError> {
        match source {
            CredentialSource::File(path) => {
                let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
                    GoogleError::Credentials(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_json(&raw)
            }
            CredentialSource::Json(raw) => Self::from_json(raw),
            CredentialSource::Base64(encoded) => {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| GoogleError::Credentials(format!("invalid base64: {}", e)))?;
                let raw = String::from_utf8(bytes)
                    .map_err(|e| GoogleError::Credentials(format!("credentials not UTF-8: {}", e)))?;
                Self::from_json(&raw)
            }
        }
    }
}
