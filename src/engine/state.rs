use serde::{Deserialize, Serialize};

use crate::errors::PatchyError;
use crate::models::report::RunOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Init,
    ResolveProjectContext,
    /// Exploit runs only; audit runs never send a request.
    RenderRequest,
    EnumerateIdentities,
    PerIdentityProbe,
    Done(RunOutcome),
}

impl DriverState {
    pub fn can_transition_to(&self, next: &DriverState) -> bool {
        use DriverState::*;
        matches!(
            (self, next),
            (Init, ResolveProjectContext)
                | (ResolveProjectContext, RenderRequest)
                | (ResolveProjectContext, EnumerateIdentities)
                | (RenderRequest, EnumerateIdentities)
                | (RenderRequest, PerIdentityProbe)
                | (EnumerateIdentities, PerIdentityProbe)
                | (EnumerateIdentities, Done(_))
                | (PerIdentityProbe, PerIdentityProbe)
                | (PerIdentityProbe, Done(_))
        )
    }
}

impl std::fmt::Display for DriverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::ResolveProjectContext => write!(f, "resolve-project-context"),
            Self::RenderRequest => write!(f, "render-request"),
            Self::EnumerateIdentities => write!(f, "enumerate-identities"),
            Self::PerIdentityProbe => write!(f, "per-identity-probe"),
            Self::Done(RunOutcome::Success) => write!(f, "done(success)"),
            Self::Done(RunOutcome::NoneFound) => write!(f, "done(none-found)"),
        }
    }
}

/// Tracks a run's progress and rejects out-of-order steps.
#[derive(Debug)]
pub struct StateTracker {
    current: DriverState,
}

impl StateTracker {
    pub fn new() -> Self {
        Self { current: DriverState::Init }
    }

    pub fn current(&self) -> DriverState {
        self.current
    }

    pub fn transition(&mut self, next: DriverState) -> Result<(), PatchyError> {
        if !self.current.can_transition_to(&next) {
            return Err(PatchyError::Internal(format!(
                "illegal driver transition {} -> {}",
                self.current, next
            )));
        }
        tracing::debug!(from = %self.current, to = %next, "Driver state change");
        self.current = next;
        Ok(())
    }
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// How far an audit run scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditScope {
    /// Stop after the first identity with a finding.
    #[default]
    FirstHit,
    /// Probe every identity.
    Exhaustive,
}
