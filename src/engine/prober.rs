use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::executor::execute_request;
use crate::errors::PatchyError;
use crate::gcp::{PatchService, PolicySearch, PolicySearchStream, RoleService};
use crate::models::finding::PermissionFinding;
use crate::models::identity::{Identity, ProjectContext};
use crate::models::patch::ExecutionRequest;

pub struct PrivilegeProber {
    policy_search: Arc<dyn PolicySearch>,
    roles: Arc<dyn RoleService>,
    patch: Arc<dyn PatchService>,
    project: ProjectContext,
}

impl PrivilegeProber {
    pub fn new(
        policy_search: Arc<dyn PolicySearch>,
        roles: Arc<dyn RoleService>,
        patch: Arc<dyn PatchService>,
        project: ProjectContext,
    ) -> Self {
        Self { policy_search, roles, patch, project }
    }

    /// Run `request` as `identity`.
    ///
    /// `Ok(false)` means the identity was denied and the caller should move on;
    /// any other failure is returned as is.
    pub async fn attempt(
        &self,
        identity: &Identity,
        request: &ExecutionRequest,
        deployment_id: &str,
    ) -> Result<bool, PatchyError> {
        let result = execute_request(
            self.patch.as_ref(),
            identity.credential.as_ref(),
            &self.project,
            request,
            deployment_id,
        )
        .await;

        match result {
            Ok(()) => Ok(true),
            Err(e) if e.classify().recoverable => {
                warn!(account = %identity.email, error = %e, "Permission denied, trying next account");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Gating permissions `identity` holds through its role bindings in the project.
    ///
    /// An identity that may not search policies or read roles has no findings.
    pub async fn audit(&self, identity: &Identity) -> Result<Vec<PermissionFinding>, PatchyError> {
        match self.collect_findings(identity).await {
            Ok(findings) => Ok(findings),
            Err(e) if e.classify().recoverable => {
                warn!(account = %identity.email, error = %e, "Permission denied during audit, trying next account");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn collect_findings(&self, identity: &Identity) -> Result<Vec<PermissionFinding>, PatchyError> {
        let credential = identity.credential.as_ref();
        let mut stream = PolicySearchStream::new(
            self.policy_search.as_ref(),
            credential,
            self.project.resource_name(),
            format!("policy:{}", identity.email),
        );

        let mut role_cache: HashMap<String, Vec<String>> = HashMap::new();
        let mut findings = Vec::new();

        while let Some(result) = stream.next().await? {
            for binding in &result.policy.bindings {
                if !role_cache.contains_key(&binding.role) {
                    let perms = self.roles.included_permissions(credential, &binding.role).await?;
                    debug!(role = %binding.role, permissions = perms.len(), "Expanded role");
                    role_cache.insert(binding.role.clone(), perms);
                }

                let perms = &role_cache[&binding.role];
                for perm in perms.iter().filter(|p| PermissionFinding::is_gating(p)) {
                    let finding = PermissionFinding {
                        identity: identity.email.clone(),
                        role: binding.role.clone(),
                        permission: perm.clone(),
                    };
                    if findings.contains(&finding) {
                        continue;
                    }
                    info!(
                        account = %identity.email,
                        permission = %perm,
                        role = %binding.role,
                        "Service account is exploitable"
                    );
                    findings.push(finding);
                }
            }
        }

        Ok(findings)
    }
}
