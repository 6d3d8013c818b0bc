use std::collections::VecDeque;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use super::http::{authorize, check_response};
use super::token::TokenSource;
use crate::errors::PatchyError;

pub const ASSET_BASE_URL: &str = "https://cloudasset.googleapis.com/v1";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Binding {
    pub role: String,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IamPolicySearchResult {
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub policy: Policy,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySearchPage {
    #[serde(default)]
    pub results: Vec<IamPolicySearchResult>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[async_trait]
pub trait PolicySearch: Send + Sync {
    /// One page of `searchAllIamPolicies` under `scope` (e.g. `projects/my-proj`).
    async fn search_page(
        &self,
        credential: &dyn TokenSource,
        scope: &str,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<PolicySearchPage, PatchyError>;
}

/// Lazily walks every page of a policy search.
pub struct PolicySearchStream<'a> {
    service: &'a dyn PolicySearch,
    credential: &'a dyn TokenSource,
    scope: String,
    query: String,
    buffered: VecDeque<IamPolicySearchResult>,
    next_page: Option<String>,
    done: bool,
}

impl<'a> PolicySearchStream<'a> {
    pub fn new(
        service: &'a dyn PolicySearch,
        credential: &'a dyn TokenSource,
        scope: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            service,
            credential,
            scope: scope.into(),
            query: query.into(),
            buffered: VecDeque::new(),
            next_page: None,
            done: false,
        }
    }

    /// Next result, fetching further pages on demand. `Ok(None)` once exhausted.
    pub async fn next(&mut self) -> Result<Option<IamPolicySearchResult>, PatchyError> {
        loop {
            if let Some(result) = self.buffered.pop_front() {
                return Ok(Some(result));
            }
            if self.done {
                return Ok(None);
            }

            let page = self.service
                .search_page(self.credential, &self.scope, &self.query, self.next_page.as_deref())
                .await?;
            self.buffered.extend(page.results);
            self.next_page = page.next_page_token.filter(|t| !t.is_empty());
            self.done = self.next_page.is_none();
        }
    }
}

pub struct AssetClient {
    client: Client,
    base_url: String,
}

impl AssetClient {
    pub fn new() -> Self {
        Self::with_base_url(ASSET_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for AssetClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolicySearch for AssetClient {
    async fn search_page(
        &self,
        credential: &dyn TokenSource,
        scope: &str,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<PolicySearchPage, PatchyError> {
        let mut url = Url::parse(&format!("{}/{}:searchAllIamPolicies", self.base_url, scope))
            .map_err(|e| PatchyError::Internal(format!("bad asset url: {}", e)))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", query);
            if let Some(token) = page_token {
                pairs.append_pair("pageToken", token);
            }
        }

        let request = authorize(self.client.get(url), credential).await?;
        let resp = check_response("cloudasset", request.send().await?).await?;
        Ok(resp.json().await?)
    }
}
