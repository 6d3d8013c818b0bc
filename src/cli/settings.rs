use std::path::PathBuf;

use crate::cli::commands::EngineArgs;
use crate::config::{self, EngineConfig, PatchyConfig};
use crate::errors::PatchyError;

/// Everything a subcommand needs once flags and the config file are merged.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub engine: EngineConfig,
    pub project: Option<String>,
    pub report: Option<PathBuf>,
}

pub async fn resolve_settings(args: &EngineArgs) -> Result<RunSettings, PatchyError> {
    let file_config = match &args.config {
        Some(path) => config::parse_config(&PathBuf::from(path)).await?,
        None => PatchyConfig::default(),
    };
    merge_settings(args, &file_config)
}

/// Command-line values win over the config file; the config file wins over defaults.
pub fn merge_settings(args: &EngineArgs, file: &PatchyConfig) -> Result<RunSettings, PatchyError> {
    let section = file.engine.clone().unwrap_or_default();

    let bucket = args.bucket.clone()
        .or(section.bucket)
        .ok_or_else(|| PatchyError::Config("a payload bucket is required (--bucket)".into()))?;

    let mut engine = EngineConfig::new(bucket);
    if let Some(v) = args.linux_payload.clone().or(section.linux_payload) {
        engine.linux_payload = v;
    }
    if let Some(v) = args.windows_payload.clone().or(section.windows_payload) {
        engine.windows_payload = v;
    }
    if let Some(v) = args.patch_name.clone().or(section.patch_name) {
        engine.patch_name = v;
    }
    if let Some(v) = args.patch_description.clone().or(section.patch_description) {
        engine.patch_description = v;
    }
    engine.persistence = args.persist || section.persistence.unwrap_or(false);

    let report = args.report.clone()
        .or_else(|| file.output.as_ref().and_then(|o| o.report.clone()))
        .map(PathBuf::from);

    Ok(RunSettings {
        engine,
        project: args.project.clone().or(section.project),
        report,
    })
}
