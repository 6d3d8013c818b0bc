use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A Cloud Storage object pinned to a specific generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcsObject {
    pub bucket: String,
    pub object: String,
    /// Google encodes int64 fields as JSON strings.
    #[serde(default, with = "int64_string", skip_serializing_if = "Option::is_none")]
    pub generation_number: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecStepConfig {
    pub gcs_object: GcsObject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_success_codes: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecStep {
    pub linux_exec_step_config: ExecStepConfig,
    pub windows_exec_step_config: ExecStepConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchConfig {
    pub pre_step: ExecStep,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `projects.patchJobs.execute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchJobRequest {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub instance_filter: Value,
    pub patch_config: PatchConfig,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `projects.patchDeployments.create`. The deployment id travels as a query parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchDeployment {
    #[serde(default)]
    pub description: String,
    pub instance_filter: Value,
    pub patch_config: PatchConfig,
    pub recurring_schedule: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// Runs once immediately, leaves nothing behind.
    OneShot,
    /// Installs a named schedule that keeps re-running until deleted.
    Recurring,
}

impl ExecutionMode {
    pub fn from_persistence(persistence: bool) -> Self {
        if persistence {
            Self::Recurring
        } else {
            Self::OneShot
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneShot => "patch-job",
            Self::Recurring => "patch-deployment",
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum ExecutionRequest {
    OneShotJob(PatchJobRequest),
    RecurringDeployment(PatchDeployment),
}

/// Generation numbers stamped into a rendered request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadGenerations {
    pub linux: i64,
    pub windows: i64,
}

impl ExecutionRequest {
    pub fn mode(&self) -> ExecutionMode {
        match self {
            Self::OneShotJob(_) => ExecutionMode::OneShot,
            Self::RecurringDeployment(_) => ExecutionMode::Recurring,
        }
    }

    pub fn pre_step(&self) -> &ExecStep {
        match self {
            Self::OneShotJob(job) => &job.patch_config.pre_step,
            Self::RecurringDeployment(dep) => &dep.patch_config.pre_step,
        }
    }

    pub fn pre_step_mut(&mut self) -> &mut ExecStep {
        match self {
            Self::OneShotJob(job) => &mut job.patch_config.pre_step,
            Self::RecurringDeployment(dep) => &mut dep.patch_config.pre_step,
        }
    }

    /// Both stamped generations, or `None` while either step is still unpinned.
    pub fn generations(&self) -> Option<PayloadGenerations> {
        let step = self.pre_step();
        Some(PayloadGenerations {
            linux: step.linux_exec_step_config.gcs_object.generation_number?,
            windows: step.windows_exec_step_config.gcs_object.generation_number?,
        })
    }

    /// Serialize the API body for this request.
    pub fn to_body(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::OneShotJob(job) => serde_json::to_value(job),
            Self::RecurringDeployment(dep) => serde_json::to_value(dep),
        }
    }
}

mod int64_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<i64>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => s.serialize_str(&v.to_string()),
            None => s.serialize_none(),
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(i64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        match Option::<Raw>::deserialize(d)? {
            None => Ok(None),
            Some(Raw::Num(n)) => Ok(Some(n)),
            Some(Raw::Str(s)) if s.is_empty() => Ok(None),
            Some(Raw::Str(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job_json() -> Value {
        json!({
            "displayName": "security-update",
            "description": "GCP Updater Client",
            "instanceFilter": { "all": true },
            "patchConfig": {
                "rebootConfig": "NEVER",
                "preStep": {
                    "linuxExecStepConfig": {
                        "gcsObject": { "bucket": "b", "object": "payload.bash", "generationNumber": "17" },
                        "interpreter": "SHELL"
                    },
                    "windowsExecStepConfig": {
                        "gcsObject": { "bucket": "b", "object": "payload.ps1" },
                        "interpreter": "POWERSHELL"
                    }
                }
            }
        })
    }

    #[test]
    fn test_generation_parsed_from_string() {
        let job: PatchJobRequest = serde_json::from_value(job_json()).unwrap();
        let linux = &job.patch_config.pre_step.linux_exec_step_config.gcs_object;
        assert_eq!(linux.generation_number, Some(17));
    }

    #[test]
    fn test_generations_none_until_both_stamped() {
        let job: PatchJobRequest = serde_json::from_value(job_json()).unwrap();
        let mut request = ExecutionRequest::OneShotJob(job);
        assert!(request.generations().is_none());

        request.pre_step_mut().windows_exec_step_config.gcs_object.generation_number = Some(9);
        assert_eq!(request.generations(), Some(PayloadGenerations { linux: 17, windows: 9 }));
    }

    #[test]
    fn test_unknown_fields_survive_serialization() {
        let job: PatchJobRequest = serde_json::from_value(job_json()).unwrap();
        let body = ExecutionRequest::OneShotJob(job).to_body().unwrap();
        assert_eq!(body["patchConfig"]["rebootConfig"], "NEVER");
        assert_eq!(
            body["patchConfig"]["preStep"]["linuxExecStepConfig"]["gcsObject"]["generationNumber"],
            "17"
        );
        assert!(body["patchConfig"]["preStep"]["windowsExecStepConfig"]["gcsObject"]
            .get("generationNumber")
            .is_none());
    }

    #[test]
    fn test_mode_from_persistence() {
        assert_eq!(ExecutionMode::from_persistence(true), ExecutionMode::Recurring);
        assert_eq!(ExecutionMode::from_persistence(false), ExecutionMode::OneShot);
    }
}
