use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use super::http::{authorize, check_response};
use super::token::TokenSource;
use crate::errors::PatchyError;

pub const STORAGE_BASE_URL: &str = "https://storage.googleapis.com/storage/v1";

/// Object metadata lookups needed to pin payload generations.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Current generation of `gs://<bucket>/<object>`.
    async fn object_generation(&self, bucket: &str, object: &str) -> Result<i64, PatchyError>;
}

#[derive(Debug, Deserialize)]
struct ObjectMetadata {
    generation: String,
}

pub struct GcsClient {
    client: Client,
    base_url: String,
    credential: Arc<dyn TokenSource>,
}

impl GcsClient {
    pub fn new(credential: Arc<dyn TokenSource>) -> Self {
        Self::with_base_url(credential, STORAGE_BASE_URL)
    }

    pub fn with_base_url(credential: Arc<dyn TokenSource>, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            credential,
        }
    }

    fn object_url(&self, bucket: &str, object: &str) -> Result<Url, PatchyError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| PatchyError::Internal(format!("bad storage base url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| PatchyError::Internal("storage base url cannot be a base".into()))?
            .extend(["b", bucket, "o", object]);
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for GcsClient {
    async fn object_generation(&self, bucket: &str, object: &str) -> Result<i64, PatchyError> {
        let url = self.object_url(bucket, object)?;
        let request = authorize(self.client.get(url), self.credential.as_ref()).await?;
        let resp = request.send().await?;

        let resp = check_response("storage", resp).await.map_err(|e| match e {
            PatchyError::Api { status: 404, .. } => {
                PatchyError::ObjectStore(format!("object gs://{}/{} not found", bucket, object))
            }
            other => PatchyError::ObjectStore(format!("gs://{}/{}: {}", bucket, object, other)),
        })?;

        let meta: ObjectMetadata = resp.json().await?;
        let generation = meta.generation.parse::<i64>().map_err(|e| {
            PatchyError::ObjectStore(format!("bad generation '{}' for {}: {}", meta.generation, object, e))
        })?;
        debug!(bucket, object, generation, "Resolved object generation");
        Ok(generation)
    }
}
