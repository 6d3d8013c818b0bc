#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use patchy::errors::PatchyError;
use patchy::gcp::asset::{Binding, IamPolicySearchResult, Policy, PolicySearchPage};
use patchy::gcp::{
    GcpServices, MetadataService, ObjectStore, PatchResponse, PatchService, PolicySearch,
    RoleService, TokenSource,
};
use patchy::models::patch::{PatchDeployment, PatchJobRequest};

pub const PROJECT: &str = "victim-prod";

pub fn email(name: &str) -> String {
    format!("{}@{}.iam.gserviceaccount.com", name, PROJECT)
}

/// Token value handed out for an account; fakes key their behaviour on it.
pub fn token_for(name: &str) -> String {
    format!("ya29.token-for-{}", name)
}

fn name_from_token(token: &str) -> String {
    token.trim_start_matches("ya29.token-for-").to_string()
}

async fn caller(credential: &dyn TokenSource) -> String {
    name_from_token(&credential.token().await.unwrap().value)
}

pub struct FakeMetadata {
    pub project: Option<String>,
    pub accounts: Vec<String>,
    pub broken_email: Option<String>,
}

impl FakeMetadata {
    pub fn new(accounts: &[&str]) -> Self {
        Self {
            project: Some(PROJECT.to_string()),
            accounts: accounts.iter().map(|a| a.to_string()).collect(),
            broken_email: None,
        }
    }
}

#[async_trait]
impl MetadataService for FakeMetadata {
    async fn get(&self, path: &str) -> Result<String, PatchyError> {
        let not_found = || PatchyError::Metadata(format!("GET {} returned 404", path));
        if path == "project/project-id" {
            return self.project.clone().ok_or_else(not_found);
        }
        if path == "instance/service-accounts/" {
            return Ok(self.accounts.iter().map(|a| format!("{}/\n", email(a))).collect());
        }
        let rest = path.strip_prefix("instance/service-accounts/").ok_or_else(not_found)?;
        let (principal, leaf) = rest.rsplit_once('/').ok_or_else(not_found)?;
        let name = principal.split('@').next().unwrap_or_default();
        match leaf {
            "token" => Ok(json!({
                "access_token": token_for(name),
                "expires_in": 3599,
                "token_type": "Bearer"
            })
            .to_string()),
            "email" if self.broken_email.as_deref() == Some(name) => Err(not_found()),
            "email" => Ok(principal.to_string()),
            _ => Err(not_found()),
        }
    }
}

#[derive(Default)]
pub struct FakeStore {
    pub generations: HashMap<String, i64>,
    pub lookups: Mutex<Vec<String>>,
}

impl FakeStore {
    pub fn with(objects: &[(&str, i64)]) -> Self {
        Self {
            generations: objects.iter().map(|(o, g)| (o.to_string(), *g)).collect(),
            lookups: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn object_generation(&self, bucket: &str, object: &str) -> Result<i64, PatchyError> {
        self.lookups.lock().unwrap().push(format!("{}/{}", bucket, object));
        self.generations
            .get(object)
            .copied()
            .ok_or_else(|| PatchyError::ObjectStore(format!("object gs://{}/{} not found", bucket, object)))
    }
}

/// Role bindings per account name, served as one result per page.
#[derive(Default)]
pub struct FakePolicySearch {
    pub bindings: HashMap<String, Vec<String>>,
    /// Accounts whose searches are refused with 403.
    pub denied: Vec<String>,
    pub queries: Mutex<Vec<String>>,
}

impl FakePolicySearch {
    pub fn with(entries: &[(&str, &[&str])]) -> Self {
        Self {
            bindings: entries
                .iter()
                .map(|(n, roles)| (n.to_string(), roles.iter().map(|r| r.to_string()).collect()))
                .collect(),
            denied: Vec::new(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn denying(mut self, names: &[&str]) -> Self {
        self.denied = names.iter().map(|n| n.to_string()).collect();
        self
    }
}

#[async_trait]
impl PolicySearch for FakePolicySearch {
    async fn search_page(
        &self,
        credential: &dyn TokenSource,
        scope: &str,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<PolicySearchPage, PatchyError> {
        assert_eq!(scope, format!("projects/{}", PROJECT));
        let name = caller(credential).await;
        assert_eq!(query, format!("policy:{}", email(&name)));
        self.queries.lock().unwrap().push(name.clone());
        if self.denied.contains(&name) {
            return Err(PatchyError::Api {
                service: "cloudasset",
                status: 403,
                message: "PERMISSION_DENIED: cloudasset.iamPolicies.search denied".into(),
            });
        }

        let roles = self.bindings.get(&name).cloned().unwrap_or_default();
        let idx: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
        let Some(role) = roles.get(idx) else {
            return Ok(PolicySearchPage::default());
        };
        Ok(PolicySearchPage {
            results: vec![IamPolicySearchResult {
                policy: Policy {
                    bindings: vec![Binding {
                        role: role.clone(),
                        members: vec![format!("serviceAccount:{}", email(&name))],
                    }],
                },
                ..Default::default()
            }],
            next_page_token: (idx + 1 < roles.len()).then(|| (idx + 1).to_string()),
        })
    }
}

#[derive(Default)]
pub struct FakeRoles {
    pub permissions: HashMap<String, Vec<String>>,
    pub fail_with: Option<u16>,
}

impl FakeRoles {
    pub fn standard() -> Self {
        let mut permissions = HashMap::new();
        permissions.insert(
            "roles/editor".to_string(),
            vec!["compute.instances.list".into(), "osconfig.patchJobs.exec".into(), "osconfig.patchDeployments.create".into()],
        );
        permissions.insert("roles/osconfig.patchJobExecutor".to_string(), vec!["osconfig.patchJobs.exec".into()]);
        permissions.insert("roles/viewer".to_string(), vec!["compute.instances.list".into()]);
        Self { permissions, fail_with: None }
    }
}

#[async_trait]
impl RoleService for FakeRoles {
    async fn included_permissions(
        &self,
        _credential: &dyn TokenSource,
        role: &str,
    ) -> Result<Vec<String>, PatchyError> {
        if let Some(status) = self.fail_with {
            return Err(PatchyError::Api { service: "iam", status, message: "backend error".into() });
        }
        Ok(self.permissions.get(role).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Clone)]
pub struct PatchCall {
    pub caller: String,
    pub parent: String,
    pub deployment_id: Option<String>,
    pub body: Value,
}

/// Patch API whose response depends on the calling account.
#[derive(Default)]
pub struct FakePatch {
    /// Account name -> HTTP status. Missing accounts get 403.
    pub statuses: HashMap<String, u16>,
    pub calls: Mutex<Vec<PatchCall>>,
}

impl FakePatch {
    pub fn allowing(entries: &[(&str, u16)]) -> Self {
        Self {
            statuses: entries.iter().map(|(n, s)| (n.to_string(), *s)).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<PatchCall> {
        self.calls.lock().unwrap().clone()
    }

    async fn respond(
        &self,
        credential: &dyn TokenSource,
        parent: &str,
        deployment_id: Option<&str>,
        body: Value,
    ) -> Result<PatchResponse, PatchyError> {
        let name = caller(credential).await;
        self.calls.lock().unwrap().push(PatchCall {
            caller: name.clone(),
            parent: parent.to_string(),
            deployment_id: deployment_id.map(str::to_string),
            body,
        });
        match self.statuses.get(&name).copied().unwrap_or(403) {
            status @ 400..=599 => Err(PatchyError::Api {
                service: "osconfig",
                status,
                message: if status == 403 { "PERMISSION_DENIED: denied".into() } else { "INTERNAL: boom".into() },
            }),
            status => Ok(PatchResponse { status, body: json!({ "name": format!("{}/patchJobs/1", parent) }) }),
        }
    }
}

#[async_trait]
impl PatchService for FakePatch {
    async fn execute_patch_job(
        &self,
        credential: &dyn TokenSource,
        parent: &str,
        job: &PatchJobRequest,
    ) -> Result<PatchResponse, PatchyError> {
        self.respond(credential, parent, None, serde_json::to_value(job)?).await
    }

    async fn create_patch_deployment(
        &self,
        credential: &dyn TokenSource,
        parent: &str,
        deployment_id: &str,
        deployment: &PatchDeployment,
    ) -> Result<PatchResponse, PatchyError> {
        self.respond(credential, parent, Some(deployment_id), serde_json::to_value(deployment)?).await
    }
}

pub struct Fakes {
    pub metadata: Arc<FakeMetadata>,
    pub store: Arc<FakeStore>,
    pub policy: Arc<FakePolicySearch>,
    pub roles: Arc<FakeRoles>,
    pub patch: Arc<FakePatch>,
}

impl Fakes {
    pub fn new(accounts: &[&str]) -> Self {
        Self {
            metadata: Arc::new(FakeMetadata::new(accounts)),
            store: Arc::new(FakeStore::with(&[("payload.bash", 1111), ("payload.ps1", 2222)])),
            policy: Arc::new(FakePolicySearch::default()),
            roles: Arc::new(FakeRoles::standard()),
            patch: Arc::new(FakePatch::default()),
        }
    }

    pub fn services(&self) -> GcpServices {
        GcpServices {
            metadata: self.metadata.clone(),
            storage: self.store.clone(),
            policy_search: self.policy.clone(),
            roles: self.roles.clone(),
            patch: self.patch.clone(),
        }
    }
}
