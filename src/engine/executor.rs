use tracing::info;

use crate::errors::PatchyError;
use crate::gcp::{PatchService, TokenSource};
use crate::models::identity::ProjectContext;
use crate::models::patch::ExecutionRequest;

const EXECUTE_PATCH_JOB: &str = "ExecutePatchJob";
const CREATE_PATCH_DEPLOYMENT: &str = "CreatePatchDeployment";

/// Send `request` to the patch API. Anything but HTTP 200 is an error.
pub async fn execute_request(
    patch: &dyn PatchService,
    credential: &dyn TokenSource,
    project: &ProjectContext,
    request: &ExecutionRequest,
    deployment_id: &str,
) -> Result<(), PatchyError> {
    if request.generations().is_none() {
        return Err(PatchyError::Template(
            "refusing to send a request with unpinned payload objects".into(),
        ));
    }

    let parent = project.resource_name();
    let (operation, response) = match request {
        ExecutionRequest::OneShotJob(job) => (
            EXECUTE_PATCH_JOB,
            patch.execute_patch_job(credential, &parent, job).await?,
        ),
        ExecutionRequest::RecurringDeployment(deployment) => (
            CREATE_PATCH_DEPLOYMENT,
            patch
                .create_patch_deployment(credential, &parent, deployment_id, deployment)
                .await?,
        ),
    };

    if response.status != 200 {
        return Err(PatchyError::UnexpectedStatus {
            operation,
            status: response.status,
        });
    }

    let name = response.body.get("name").and_then(|n| n.as_str()).unwrap_or("");
    info!(operation, project = %project.project_id, resource = name, "Patch request accepted");
    Ok(())
}
