use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::errors::PatchyError;
use crate::gcp::ObjectStore;
use crate::models::patch::{
    ExecutionMode, ExecutionRequest, PatchDeployment, PatchJobRequest, PayloadGenerations,
};

pub const PATCH_JOB_TEMPLATE: &str = include_str!("../../templates/patch_job.json");
pub const PATCH_DEPLOYMENT_TEMPLATE: &str = include_str!("../../templates/patch_deployment.json");

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{[A-Z_]+\}\}").unwrap());

/// The values the templates may reference, and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateValues {
    pub patch_name: String,
    pub patch_description: String,
    pub bucket: String,
    pub linux_script: String,
    pub windows_script: String,
}

impl From<&EngineConfig> for TemplateValues {
    fn from(config: &EngineConfig) -> Self {
        Self {
            patch_name: config.patch_name.clone(),
            patch_description: config.patch_description.clone(),
            bucket: config.bucket.clone(),
            linux_script: config.linux_payload.clone(),
            windows_script: config.windows_payload.clone(),
        }
    }
}

/// Escape `value` for use inside a JSON string literal.
fn json_escape(value: &str) -> String {
    let quoted = serde_json::Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

const KNOWN_PLACEHOLDERS: [&str; 5] = [
    "{{PATCH_NAME}}",
    "{{PATCH_DESCRIPTION}}",
    "{{BUCKET_NAME}}",
    "{{LINUX_SCRIPT_NAME}}",
    "{{WINDOWS_SCRIPT_NAME}}",
];

/// Replace `{{PLACEHOLDER}}`s with escaped values.
pub fn interpolate(template: &str, values: &TemplateValues) -> String {
    let replacements: [(&str, &str); 5] = [
        (KNOWN_PLACEHOLDERS[0], &values.patch_name),
        (KNOWN_PLACEHOLDERS[1], &values.patch_description),
        (KNOWN_PLACEHOLDERS[2], &values.bucket),
        (KNOWN_PLACEHOLDERS[3], &values.linux_script),
        (KNOWN_PLACEHOLDERS[4], &values.windows_script),
    ];

    let mut result = template.to_string();
    for (placeholder, value) in replacements {
        result = result.replace(placeholder, &json_escape(value));
    }
    result
}

/// Placeholders in `template` that `interpolate` would leave untouched.
pub fn unresolved_placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER
        .find_iter(template)
        .map(|m| m.as_str())
        .filter(|p| !KNOWN_PLACEHOLDERS.contains(p))
        .map(str::to_string)
        .collect()
}

pub struct RequestTemplater {
    values: TemplateValues,
    store: Arc<dyn ObjectStore>,
    job_template: String,
    deployment_template: String,
}

impl RequestTemplater {
    pub fn new(values: TemplateValues, store: Arc<dyn ObjectStore>) -> Self {
        Self::with_templates(values, store, PATCH_JOB_TEMPLATE, PATCH_DEPLOYMENT_TEMPLATE)
    }

    pub fn with_templates(
        values: TemplateValues,
        store: Arc<dyn ObjectStore>,
        job_template: &str,
        deployment_template: &str,
    ) -> Self {
        Self {
            values,
            store,
            job_template: job_template.to_string(),
            deployment_template: deployment_template.to_string(),
        }
    }

    /// Render the request for `mode` with both payload generations stamped in.
    pub async fn render(&self, mode: ExecutionMode) -> Result<ExecutionRequest, PatchyError> {
        let template = match mode {
            ExecutionMode::OneShot => &self.job_template,
            ExecutionMode::Recurring => &self.deployment_template,
        };

        let unresolved = unresolved_placeholders(template);
        if !unresolved.is_empty() {
            return Err(PatchyError::Template(format!(
                "{} template has unresolved placeholders: {}",
                mode,
                unresolved.join(", ")
            )));
        }
        let rendered = interpolate(template, &self.values);

        let mut request = parse_request(mode, &rendered)?;
        let generations = self.stamp_generations(&mut request).await?;
        info!(
            mode = %mode,
            linux_generation = generations.linux,
            windows_generation = generations.windows,
            "Rendered patch request"
        );
        Ok(request)
    }

    async fn stamp_generations(
        &self,
        request: &mut ExecutionRequest,
    ) -> Result<PayloadGenerations, PatchyError> {
        let step = request.pre_step();
        let windows_obj = step.windows_exec_step_config.gcs_object.clone();
        let linux_obj = step.linux_exec_step_config.gcs_object.clone();

        let windows = self.store.object_generation(&windows_obj.bucket, &windows_obj.object).await?;
        let linux = self.store.object_generation(&linux_obj.bucket, &linux_obj.object).await?;
        debug!(windows, linux, "Resolved payload generations");

        let step = request.pre_step_mut();
        step.windows_exec_step_config.gcs_object.generation_number = Some(windows);
        step.linux_exec_step_config.gcs_object.generation_number = Some(linux);

        Ok(PayloadGenerations { linux, windows })
    }
}

fn parse_request(mode: ExecutionMode, rendered: &str) -> Result<ExecutionRequest, PatchyError> {
    let parse_err = |e: serde_json::Error| {
        PatchyError::Template(format!("rendered {} is not a valid request: {}", mode, e))
    };
    Ok(match mode {
        ExecutionMode::OneShot => {
            ExecutionRequest::OneShotJob(serde_json::from_str::<PatchJobRequest>(rendered).map_err(parse_err)?)
        }
        ExecutionMode::Recurring => ExecutionRequest::RecurringDeployment(
            serde_json::from_str::<PatchDeployment>(rendered).map_err(parse_err)?,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values() -> TemplateValues {
        TemplateValues {
            patch_name: "security-update".into(),
            patch_description: "GCP Updater Client".into(),
            bucket: "drop-zone".into(),
            linux_script: "payload.bash".into(),
            windows_script: "payload.ps1".into(),
        }
    }

    #[test]
    fn test_interpolate_fills_every_placeholder() {
        assert!(unresolved_placeholders(PATCH_DEPLOYMENT_TEMPLATE).is_empty());
        let out = interpolate(PATCH_DEPLOYMENT_TEMPLATE, &values());
        assert!(!PLACEHOLDER.is_match(&out));
        assert!(out.contains("\"bucket\": \"drop-zone\""));
        assert!(out.contains("\"object\": \"payload.ps1\""));
    }

    #[test]
    fn test_interpolate_escapes_quotes() {
        let mut v = values();
        v.patch_description = "say \"hi\"\nbye".into();
        let out = interpolate(PATCH_JOB_TEMPLATE, &v);
        let job: PatchJobRequest = serde_json::from_str(&out).unwrap();
        assert_eq!(job.description, "say \"hi\"\nbye");
    }

    #[test]
    fn test_unresolved_placeholders() {
        let found = unresolved_placeholders(r#"{"x": "{{UNKNOWN_FIELD}}", "y": "{{BUCKET_NAME}}"}"#);
        assert_eq!(found, vec!["{{UNKNOWN_FIELD}}"]);
        assert!(unresolved_placeholders(r#"{"x": "{ not a placeholder }"}"#).is_empty());
    }

    #[test]
    fn test_placeholder_like_value_is_not_unresolved() {
        let mut v = values();
        v.patch_description = "{{PATCH_NAME}}".into();
        let out = interpolate(PATCH_JOB_TEMPLATE, &v);
        let job: PatchJobRequest = serde_json::from_str(&out).unwrap();
        assert_eq!(job.display_name, "security-update");
    }

    #[test]
    fn test_bundled_templates_parse() {
        let job = parse_request(ExecutionMode::OneShot, &interpolate(PATCH_JOB_TEMPLATE, &values())).unwrap();
        assert_eq!(job.mode(), ExecutionMode::OneShot);
        let step = job.pre_step();
        assert_eq!(step.linux_exec_step_config.gcs_object.object, "payload.bash");
        assert_eq!(step.windows_exec_step_config.gcs_object.object, "payload.ps1");
        assert!(job.generations().is_none());

        let dep = parse_request(
            ExecutionMode::Recurring,
            &interpolate(PATCH_DEPLOYMENT_TEMPLATE, &values()),
        )
        .unwrap();
        match dep {
            ExecutionRequest::RecurringDeployment(d) => {
                assert_eq!(d.recurring_schedule["frequency"], "DAILY");
                assert_eq!(d.description, "GCP Updater Client");
            }
            other => panic!("expected deployment, got {:?}", other.mode()),
        }
    }
}
