use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::token::{AccessToken, TokenResponse, TokenSource};
use crate::errors::PatchyError;

pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";
const METADATA_TIMEOUT: Duration = Duration::from_secs(1);

/// Read-only view of the metadata server. Paths are relative to `computeMetadata/v1/`.
#[async_trait]
pub trait MetadataService: Send + Sync {
    async fn get(&self, path: &str) -> Result<String, PatchyError>;

    async fn project_id(&self) -> Result<String, PatchyError> {
        let id = self.get("project/project-id").await?;
        let id = id.trim();
        if id.is_empty() {
            return Err(PatchyError::Metadata("empty project id".into()));
        }
        Ok(id.to_string())
    }
}

pub struct HttpMetadataClient {
    client: Client,
    base_url: String,
}

impl HttpMetadataClient {
    /// Honours `GCE_METADATA_HOST` the same way the Google SDKs do.
    pub fn new() -> Result<Self, PatchyError> {
        let host = std::env::var("GCE_METADATA_HOST")
            .ok()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_METADATA_HOST.to_string());
        Self::with_base_url(&format!("http://{}/computeMetadata/v1", host))
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, PatchyError> {
        let client = Client::builder()
            .timeout(METADATA_TIMEOUT)
            .build()
            .map_err(|e| PatchyError::Internal(format!("failed to build metadata client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MetadataService for HttpMetadataClient {
    async fn get(&self, path: &str) -> Result<String, PatchyError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let resp = self.client
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| PatchyError::Metadata(format!("GET {} failed: {}", path, e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PatchyError::Metadata(format!("GET {} returned {}", path, status.as_u16())));
        }

        resp.text()
            .await
            .map_err(|e| PatchyError::Metadata(format!("GET {} body: {}", path, e)))
    }
}

/// Token source backed by an account attached to this instance. Fetches on every call.
pub struct MetadataTokenSource {
    metadata: Arc<dyn MetadataService>,
    account: String,
}

impl MetadataTokenSource {
    pub fn new(metadata: Arc<dyn MetadataService>, account: impl Into<String>) -> Self {
        Self { metadata, account: account.into() }
    }

    /// The instance's default service account.
    pub fn default_account(metadata: Arc<dyn MetadataService>) -> Self {
        Self::new(metadata, "default")
    }
}

/// Fetch and decode `instance/service-accounts/<account>/token`.
pub async fn fetch_account_token(
    metadata: &dyn MetadataService,
    account: &str,
) -> Result<AccessToken, PatchyError> {
    let raw = metadata
        .get(&format!("instance/service-accounts/{}/token", account))
        .await?;
    let resp: TokenResponse = serde_json::from_str(&raw)
        .map_err(|e| PatchyError::Metadata(format!("bad token payload for {}: {}", account, e)))?;
    resp.into_access_token()
}

#[async_trait]
impl TokenSource for MetadataTokenSource {
    async fn token(&self) -> Result<AccessToken, PatchyError> {
        fetch_account_token(self.metadata.as_ref(), &self.account).await
    }
}
