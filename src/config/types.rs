use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::errors::PatchyError;

pub const DEFAULT_LINUX_PAYLOAD: &str = "payload.bash";
pub const DEFAULT_WINDOWS_PAYLOAD: &str = "payload.ps1";
pub const DEFAULT_PATCH_NAME: &str = "security-update";
pub const DEFAULT_PATCH_DESCRIPTION: &str = "GCP Updater Client";

/// Patch deployment ids: lowercase letters, digits and hyphens, 1-63 chars.
static DEPLOYMENT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z](?:[a-z0-9-]{0,61}[a-z0-9])?$").unwrap());

/// Settings the engine is built with. Fixed for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Bucket that already holds both payloads.
    pub bucket: String,
    pub linux_payload: String,
    pub windows_payload: String,
    /// Patch job display name, or patch deployment id.
    pub patch_name: String,
    pub patch_description: String,
    /// Install a recurring patch deployment instead of a one-shot job.
    pub persistence: bool,
}

impl EngineConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            linux_payload: DEFAULT_LINUX_PAYLOAD.to_string(),
            windows_payload: DEFAULT_WINDOWS_PAYLOAD.to_string(),
            patch_name: DEFAULT_PATCH_NAME.to_string(),
            patch_description: DEFAULT_PATCH_DESCRIPTION.to_string(),
            persistence: false,
        }
    }

    pub fn validate(&self) -> Result<(), PatchyError> {
        if self.bucket.trim().is_empty() {
            return Err(PatchyError::Config("bucket name is required".into()));
        }
        if self.linux_payload.trim().is_empty() || self.windows_payload.trim().is_empty() {
            return Err(PatchyError::Config("payload object names must not be empty".into()));
        }
        if self.persistence && !DEPLOYMENT_ID.is_match(&self.patch_name) {
            return Err(PatchyError::Config(format!(
                "invalid patch deployment name '{}': use 1-63 lowercase letters, digits or hyphens, starting with a letter",
                self.patch_name
            )));
        }
        Ok(())
    }
}

/// Optional YAML config file. Every field can also come from the command line.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PatchyConfig {
    pub engine: Option<EngineSection>,
    pub output: Option<OutputSection>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct EngineSection {
    pub bucket: Option<String>,
    pub linux_payload: Option<String>,
    pub windows_payload: Option<String>,
    pub patch_name: Option<String>,
    pub patch_description: Option<String>,
    pub persistence: Option<bool>,
    pub project: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct OutputSection {
    /// Path of the JSON run report.
    pub report: Option<String>,
}
