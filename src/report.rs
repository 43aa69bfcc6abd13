//! Report rendering. The analysis core produces a serializable
//! `AnalysisReport`; this module turns it into terminal text or JSON.

use crate::core::{AnalysisReport, IssueKind, Severity};
use std::fmt::Write as _;

pub fn render_json(report: &AnalysisReport) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn render_terminal(report: &AnalysisReport) -> String {
    let mut out = String::new();

    writeln!(out, "Test suite analysis").unwrap();
    writeln!(out, "===================").unwrap();
    writeln!(
        out,
        "packages: {}  files: {} analyzed, {} skipped  functions: {}",
        report.packages_analyzed,
        report.files_analyzed,
        report.files_skipped,
        report.functions_analyzed
    )
    .unwrap();
    writeln!(out, "issues: {}", report.issues_found).unwrap();

    if report.issues_found > 0 {
        let mut by_severity: Vec<_> = report.issues_by_severity.iter().collect();
        by_severity.sort_by(|a, b| b.0.cmp(a.0));
        let severities = by_severity
            .iter()
            .map(|(severity, count)| format!("{severity}: {count}"))
            .collect::<Vec<_>>()
            .join("  ");
        writeln!(out, "  by severity  {severities}").unwrap();

        let mut by_kind: Vec<(&IssueKind, &usize)> = report.issues_by_kind.iter().collect();
        by_kind.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.to_string().cmp(&b.0.to_string())));
        for (kind, count) in by_kind {
            writeln!(out, "  {count:>4}  {kind}").unwrap();
        }
    }

    for file in &report.files {
        if file.issues.is_empty() {
            continue;
        }
        writeln!(out).unwrap();
        writeln!(out, "{} ({})", file.path.display(), file.package).unwrap();
        for issue in &file.issues {
            writeln!(
                out,
                "  {}:{} [{}] {}: {}",
                issue.location.function,
                issue.location.line_start,
                severity_tag(issue.severity),
                issue.kind,
                issue.description
            )
            .unwrap();
        }
    }

    if report.fixes_applied > 0 || report.fixes_failed > 0 {
        writeln!(out).unwrap();
        writeln!(
            out,
            "fixes: {} applied, {} failed",
            report.fixes_applied, report.fixes_failed
        )
        .unwrap();
    }
    writeln!(out).unwrap();
    writeln!(out, "completed in {}ms", report.execution_time_ms).unwrap();
    out
}

fn severity_tag(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "LOW",
        Severity::Medium => "MED",
        Severity::High => "HIGH",
        Severity::Critical => "CRIT",
    }
}
