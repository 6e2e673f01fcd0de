//! OAuth2 JWT-bearer grant for service accounts.

use std::time::{Duration, Instant};

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{GoogleError, ServiceAccountKey};

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const JWT_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_TTL_SECS: i64 = 3600;
/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

/// Hands out access tokens, exchanging a fresh assertion when the cached one
/// is close to expiry.
pub struct TokenProvider {
    http: Client,
    key: ServiceAccountKey,
    scope: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(http: Client, key: ServiceAccountKey, scope: &str) -> Self {
        Self {
            http,
            key,
            scope: scope.to_string(),
            cached: Mutex::new(None),
        }
    }

    /// Signed assertion for the token endpoint.
    fn assertion(&self) -> Result<String, GoogleError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_TTL_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| GoogleError::Credentials(format!("invalid private key: {}", e)))?;
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| GoogleError::Credentials(format!("cannot sign assertion: {}", e)))
    }

    pub async fn access_token(&self) -> Result<String, GoogleError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.access_token.clone());
            }
        }

        let assertion = self.assertion()?;
        let resp = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| GoogleError::Token(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| GoogleError::Token(e.to_string()))?;
        if !status.is_success() {
            return Err(GoogleError::Token(format!("{} - {}", status, text)));
        }

        let parsed: TokenResponse =
            serde_json::from_str(&text).map_err(|e| GoogleError::Token(e.to_string()))?;
        let lifetime = Duration::from_secs(parsed.expires_in).saturating_sub(EXPIRY_MARGIN);
        tracing::debug!("Obtained Google access token valid for {}s", parsed.expires_in);

        *cached = Some(CachedToken {
            access_token: parsed.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(parsed.access_token)
    }
}
