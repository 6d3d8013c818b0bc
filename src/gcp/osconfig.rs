use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::debug;

use super::http::{authorize, check_response};
use super::token::TokenSource;
use crate::errors::PatchyError;
use crate::models::patch::{PatchDeployment, PatchJobRequest};

pub const OSCONFIG_BASE_URL: &str = "https://osconfig.googleapis.com/v1";

/// Transport-level success. The caller still has to check `status`.
#[derive(Debug, Clone)]
pub struct PatchResponse {
    pub status: u16,
    pub body: Value,
}

#[async_trait]
pub trait PatchService: Send + Sync {
    /// `projects.patchJobs.execute` under `parent` (`projects/<id>`).
    async fn execute_patch_job(
        &self,
        credential: &dyn TokenSource,
        parent: &str,
        job: &PatchJobRequest,
    ) -> Result<PatchResponse, PatchyError>;

    /// `projects.patchDeployments.create` with the given deployment id.
    async fn create_patch_deployment(
        &self,
        credential: &dyn TokenSource,
        parent: &str,
        deployment_id: &str,
        deployment: &PatchDeployment,
    ) -> Result<PatchResponse, PatchyError>;
}

pub struct OsConfigClient {
    client: Client,
    base_url: String,
}

impl OsConfigClient {
    pub fn new() -> Self {
        Self::with_base_url(OSCONFIG_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post(
        &self,
        credential: &dyn TokenSource,
        url: Url,
        body: &Value,
    ) -> Result<PatchResponse, PatchyError> {
        let request = authorize(self.client.post(url), credential).await?;
        let resp = check_response("osconfig", request.json(body).send().await?).await?;
        let status = resp.status().as_u16();
        let body = decode_body(status, &resp.bytes().await?);
        Ok(PatchResponse { status, body })
    }
}

impl Default for OsConfigClient {
    fn default() -> Self {
        Self::new()
    }
}

/// The operation returned by the API, or `Null` when the body is not JSON.
fn decode_body(status: u16, raw: &[u8]) -> Value {
    match serde_json::from_slice(raw) {
        Ok(body) => body,
        Err(e) => {
            debug!(status, error = %e, "Patch response body is not JSON");
            Value::Null
        }
    }
}

fn parse_url(raw: &str) -> Result<Url, PatchyError> {
    Url::parse(raw).map_err(|e| PatchyError::Internal(format!("bad osconfig url {}: {}", raw, e)))
}

#[async_trait]
impl PatchService for OsConfigClient {
    async fn execute_patch_job(
        &self,
        credential: &dyn TokenSource,
        parent: &str,
        job: &PatchJobRequest,
    ) -> Result<PatchResponse, PatchyError> {
        let url = parse_url(&format!("{}/{}/patchJobs:execute", self.base_url, parent))?;
        self.post(credential, url, &serde_json::to_value(job)?).await
    }

    async fn create_patch_deployment(
        &self,
        credential: &dyn TokenSource,
        parent: &str,
        deployment_id: &str,
        deployment: &PatchDeployment,
    ) -> Result<PatchResponse, PatchyError> {
        let mut url = parse_url(&format!("{}/{}/patchDeployments", self.base_url, parent))?;
        url.query_pairs_mut().append_pair("patchDeploymentId", deployment_id);
        self.post(credential, url, &serde_json::to_value(deployment)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_body_reads_operation_name() {
        let body = decode_body(200, br#"{"name":"projects/p/patchJobs/123"}"#);
        assert_eq!(body["name"], "projects/p/patchJobs/123");
    }

    #[test]
    fn test_decode_body_falls_back_to_null() {
        assert_eq!(decode_body(200, b"<html>ok</html>"), Value::Null);
        assert_eq!(decode_body(200, b""), Value::Null);
    }
}
