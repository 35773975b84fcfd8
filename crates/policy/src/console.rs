use crate::report::{ComplianceReport, ComplianceStatus, Priority};
use colored::{ColoredString, Colorize};
use r2audit_core::Severity;

const RULE: &str = "============================================================";

fn status_label(status: ComplianceStatus) -> ColoredString {
    match status {
        ComplianceStatus::Pass => status.as_str().green().bold(),
        ComplianceStatus::Fail => status.as_str().red().bold(),
    }
}

fn severity_label(severity: Severity) -> ColoredString {
    let label = format!("{:<8}", severity.as_str());
    match severity {
        Severity::Critical => label.red().bold(),
        Severity::High => label.yellow().bold(),
        Severity::Medium => label.cyan(),
        Severity::Low => label.white(),
    }
}

fn priority_label(priority: Priority) -> ColoredString {
    let label = format!("[{}]", priority.as_str());
    match priority {
        Priority::Immediate => label.red().bold(),
        Priority::High => label.yellow(),
        Priority::Medium => label.cyan(),
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Console rendering of a report: status, score, per-severity counts and
/// numbered recommendations.
pub fn render_summary(report: &ComplianceReport) -> String {
    let summary = &report.summary;
    let mut out = String::new();

    out.push_str(&format!("{RULE}\n{}\n{RULE}\n", "COMPLIANCE REPORT".bold()));
    out.push_str(&format!("Status:           {}\n", status_label(summary.status)));
    out.push_str(&format!("Compliance score: {:.1}/100\n", summary.compliance_score));
    out.push_str(&format!("Total violations: {}\n", summary.total_violations));

    for severity in Severity::ALL {
        let count = summary.violations_by_severity.get(&severity).copied().unwrap_or(0);
        out.push_str(&format!("  {} {}\n", severity_label(severity), count));
    }

    if !report.recommendations.is_empty() {
        out.push_str("\nRecommendations:\n");
        for (i, rec) in report.recommendations.iter().enumerate() {
            out.push_str(&format!(
                "  {}. {} {} ({} violation{}, {} resource{}): {}\n",
                i + 1,
                priority_label(rec.priority),
                rec.category,
                rec.violations,
                plural(rec.violations),
                rec.affected_resources,
                plural(rec.affected_resources),
                rec.action
            ));
            out.push_str(&format!("     {}\n", rec.impact.dimmed()));
        }
    }
    out.push_str(RULE);
    out.push('\n');
    out
}
