use std::path::Path;

use tracing::info;

use super::formatter::format_report_markdown;
use crate::errors::PatchyError;
use crate::models::report::RunReport;

/// Write the JSON report to `path` and a Markdown rendering next to it.
pub async fn write_report(report: &RunReport, path: &Path) -> Result<(), PatchyError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_string_pretty(report)?;
    tokio::fs::write(path, &json).await?;
    info!(path = %path.display(), "Wrote run report");

    let md_path = path.with_extension("md");
    tokio::fs::write(&md_path, format_report_markdown(report)).await?;
    info!(path = %md_path.display(), "Wrote run summary");
    Ok(())
}
