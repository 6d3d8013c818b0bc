use serde::{Deserialize, Serialize};

/// Permission that allows running patch jobs, and with them arbitrary pre-step scripts.
pub const PERM_EXECUTE_PATCH_JOB: &str = "osconfig.patchJobs.exec";
/// Permission that allows installing recurring patch deployments.
pub const PERM_CREATE_PATCH_DEPLOYMENT: &str = "osconfig.patchDeployments.create";

/// The permissions that make an identity usable for this technique.
pub const GATING_PERMISSIONS: [&str; 2] = [PERM_EXECUTE_PATCH_JOB, PERM_CREATE_PATCH_DEPLOYMENT];

/// An identity holds a gating permission through a bound role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionFinding {
    pub identity: String,
    pub role: String,
    pub permission: String,
}

impl PermissionFinding {
    pub fn is_gating(permission: &str) -> bool {
        GATING_PERMISSIONS.contains(&permission)
    }
}
