use std::path::Path;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::http::check_response;
use super::token::{AccessToken, TokenResponse, TokenSource};
use crate::errors::PatchyError;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const MAX_KEY_FILE_BYTES: u64 = 64 * 1024;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    pub client_email: String,
    #[serde(default)]
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("project_id", &self.project_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_json(content: &str) -> Result<Self, PatchyError> {
        let key: ServiceAccountKey = serde_json::from_str(content)
            .map_err(|e| PatchyError::Credential(format!("invalid credential file: {}", e)))?;

        if key.client_email.trim().is_empty() {
            return Err(PatchyError::Credential("credential file has an empty client_email".into()));
        }
        if let Some(kind) = &key.key_type {
            if kind != "service_account" {
                return Err(PatchyError::Credential(format!(
                    "unsupported credential type '{}', expected service_account",
                    kind
                )));
            }
        }
        Ok(key)
    }

    pub async fn load(path: &Path) -> Result<Self, PatchyError> {
        if !path.exists() {
            return Err(PatchyError::Credential(format!(
                "credential file not found: {}",
                path.display()
            )));
        }
        let metadata = tokio::fs::metadata(path).await?;
        if metadata.len() > MAX_KEY_FILE_BYTES {
            return Err(PatchyError::Credential("credential file exceeds 64KB limit".into()));
        }
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content)
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Mints access tokens from a key file, caching each until shortly before expiry.
pub struct KeyFileTokenSource {
    key: ServiceAccountKey,
    client: Client,
    scope: String,
    cached: Mutex<Option<AccessToken>>,
}

impl KeyFileTokenSource {
    pub fn new(key: ServiceAccountKey) -> Self {
        Self {
            key,
            client: Client::new(),
            scope: CLOUD_PLATFORM_SCOPE.to_string(),
            cached: Mutex::new(None),
        }
    }

    fn sign_assertion(&self) -> Result<String, PatchyError> {
        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| PatchyError::Credential(format!("invalid private key: {}", e)))?;

        encode(&header, &claims, &signing_key)
            .map_err(|e| PatchyError::Credential(format!("failed to sign assertion: {}", e)))
    }

    async fn exchange(&self) -> Result<AccessToken, PatchyError> {
        let assertion = self.sign_assertion()?;
        debug!(account = %self.key.client_email, "Exchanging key file assertion for access token");

        let resp = self.client
            .post(&self.key.token_uri)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(format!("grant_type={}&assertion={}", JWT_BEARER_GRANT, assertion))
            .send()
            .await?;
        let resp = check_response("oauth2", resp).await
            .map_err(|e| PatchyError::Credential(format!("token exchange failed: {}", e)))?;

        let token: TokenResponse = resp.json().await?;
        token.into_access_token()
    }
}

#[async_trait]
impl TokenSource for KeyFileTokenSource {
    async fn token(&self) -> Result<AccessToken, PatchyError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token.expires_within(Duration::minutes(1)) {
                return Ok(token.clone());
            }
        }
        let fresh = self.exchange().await?;
        *cached = Some(fresh.clone());
        Ok(fresh)
    }
}
