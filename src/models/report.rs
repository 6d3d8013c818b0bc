use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::finding::PermissionFinding;
use super::patch::ExecutionMode;

/// How the identities were probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    /// Run the request directly with each identity.
    Exploit,
    /// Inspect IAM bindings without touching the patch API.
    #[default]
    Audit,
}

impl std::fmt::Display for ProbeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exploit => f.write_str("exploit"),
            Self::Audit => f.write_str("audit"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// At least one identity was exploited or found exploitable.
    Success,
    /// Every identity was probed without a hit.
    NoneFound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub project: String,
    pub probe_mode: ProbeMode,
    pub execution_mode: ExecutionMode,
    pub outcome: RunOutcome,
    /// Identity that executed the request, exploit mode only.
    pub exploited_identity: Option<String>,
    pub findings: Vec<PermissionFinding>,
    pub identities_probed: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Distinct identities with at least one finding, in probe order.
    pub fn exploitable_identities(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for f in &self.findings {
            if !seen.contains(&f.identity.as_str()) {
                seen.push(&f.identity);
            }
        }
        seen
    }

    pub fn duration_ms(&self) -> u64 {
        self.finished_at
            .signed_duration_since(self.started_at)
            .num_milliseconds()
            .unsigned_abs()
    }
}
