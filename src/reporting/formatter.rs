use console::style;

use crate::models::finding::PermissionFinding;
use crate::models::report::{ProbeMode, RunOutcome, RunReport};
use crate::utils::formatting::format_duration;

pub fn format_findings_markdown(findings: &[PermissionFinding]) -> String {
    if findings.is_empty() {
        return "No exploitable service accounts found.\n".to_string();
    }
    let mut out = String::from("| Service account | Role | Permission |\n|---|---|---|\n");
    for f in findings {
        out.push_str(&format!("| {} | {} | `{}` |\n", f.identity, f.role, f.permission));
    }
    out
}

pub fn format_report_markdown(report: &RunReport) -> String {
    let mut out = format!(
        "# Patchy Run {}\n\n- Project: {}\n- Mode: {} ({})\n- Outcome: {:?}\n- Duration: {}\n- Accounts probed: {}\n",
        report.run_id,
        report.project,
        report.probe_mode,
        report.execution_mode,
        report.outcome,
        format_duration(report.duration_ms()),
        report.identities_probed.len(),
    );
    if let Some(account) = &report.exploited_identity {
        out.push_str(&format!("- Executed as: {}\n", account));
    }
    out.push_str("\n## Findings\n\n");
    out.push_str(&format_findings_markdown(&report.findings));
    out
}

/// One-screen terminal summary.
pub fn format_summary(report: &RunReport) -> String {
    let headline = match (report.outcome, report.probe_mode) {
        (RunOutcome::Success, ProbeMode::Exploit) => style(format!(
            "[+] {} created with {}",
            report.execution_mode,
            report.exploited_identity.as_deref().unwrap_or("unknown account")
        ))
        .green()
        .bold(),
        (RunOutcome::Success, ProbeMode::Audit) => style(format!(
            "[+] {} exploitable service account(s)",
            report.exploitable_identities().len()
        ))
        .green()
        .bold(),
        (RunOutcome::NoneFound, _) => {
            style("[-] No valid service accounts or accounts are under privileged".to_string()).yellow()
        }
    };

    let mut out = format!("{}\n", headline);
    for f in &report.findings {
        out.push_str(&format!(
            "    {} {} via {}\n",
            style(&f.identity).cyan(),
            f.permission,
            style(&f.role).dim()
        ));
    }
    out.push_str(&format!(
        "    project {} | {} account(s) probed | {}\n",
        report.project,
        report.identities_probed.len(),
        format_duration(report.duration_ms())
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::patch::ExecutionMode;
    use chrono::Utc;
    use uuid::Uuid;

    fn report(findings: Vec<PermissionFinding>, outcome: RunOutcome) -> RunReport {
        RunReport {
            run_id: Uuid::new_v4(),
            project: "victim".into(),
            probe_mode: ProbeMode::Audit,
            execution_mode: ExecutionMode::OneShot,
            outcome,
            exploited_identity: None,
            findings,
            identities_probed: vec!["a@victim.iam.gserviceaccount.com".into()],
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn test_markdown_lists_findings() {
        let r = report(
            vec![PermissionFinding {
                identity: "a@victim.iam.gserviceaccount.com".into(),
                role: "roles/editor".into(),
                permission: "osconfig.patchJobs.exec".into(),
            }],
            RunOutcome::Success,
        );
        let md = format_report_markdown(&r);
        assert!(md.contains("| a@victim.iam.gserviceaccount.com | roles/editor | `osconfig.patchJobs.exec` |"));
        assert!(md.contains("- Project: victim"));
    }

    #[test]
    fn test_summary_none_found() {
        let r = report(vec![], RunOutcome::NoneFound);
        let summary = console::strip_ansi_codes(&format_summary(&r)).to_string();
        assert!(summary.contains("No valid service accounts"));
        assert!(summary.contains("1 account(s) probed"));
    }
}
