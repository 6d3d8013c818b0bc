use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::http::{authorize, check_response};
use super::token::TokenSource;
use crate::errors::PatchyError;

pub const IAM_BASE_URL: &str = "https://iam.googleapis.com/v1";

/// Role introspection.
#[async_trait]
pub trait RoleService: Send + Sync {
    /// Permissions granted by `role` (`roles/editor`, `projects/p/roles/custom`, ...).
    async fn included_permissions(
        &self,
        credential: &dyn TokenSource,
        role: &str,
    ) -> Result<Vec<String>, PatchyError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Role {
    #[serde(default)]
    included_permissions: Vec<String>,
}

pub struct IamClient {
    client: Client,
    base_url: String,
}

impl IamClient {
    pub fn new() -> Self {
        Self::with_base_url(IAM_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for IamClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoleService for IamClient {
    async fn included_permissions(
        &self,
        credential: &dyn TokenSource,
        role: &str,
    ) -> Result<Vec<String>, PatchyError> {
        let url = format!("{}/{}", self.base_url, role.trim_start_matches('/'));
        let request = authorize(self.client.get(&url), credential).await?;
        let resp = check_response("iam", request.send().await?).await?;
        let role: Role = resp.json().await?;
        Ok(role.included_permissions)
    }
}
