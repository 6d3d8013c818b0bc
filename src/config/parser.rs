use std::path::Path;
use crate::errors::PatchyError;
use super::credentials::resolve_credential;
use super::types::PatchyConfig;
use super::schema::CONFIG_SCHEMA;
use tracing::warn;

pub async fn parse_config(path: &Path) -> Result<PatchyConfig, PatchyError> {
    if !path.exists() {
        return Err(PatchyError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(PatchyError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<PatchyConfig, PatchyError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;

    validate_schema(&yaml)?;

    let mut config: PatchyConfig = serde_yaml::from_value(yaml)?;
    resolve_env_references(&mut config);
    Ok(config)
}

/// Validate config against the JSON schema. Advisory: problems are logged, not fatal.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), PatchyError> {
    let json_value = serde_json::to_value(yaml)
        .map_err(|e| PatchyError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| PatchyError::Config(format!("Schema compilation error: {}", e)))?;

    if let Err(errors) = compiled.validate(&json_value) {
        for e in errors {
            warn!(validation_error = %format!("{} at {}", e, e.instance_path), "Config schema warning");
        }
    }

    Ok(())
}

/// `$VAR` values are looked up in the environment.
fn resolve_env_references(config: &mut PatchyConfig) {
    if let Some(engine) = config.engine.as_mut() {
        for field in [
            &mut engine.bucket,
            &mut engine.linux_payload,
            &mut engine.windows_payload,
            &mut engine.patch_name,
            &mut engine.patch_description,
            &mut engine.project,
        ] {
            if let Some(value) = field.as_mut() {
                *value = resolve_credential(value);
            }
        }
    }
}
