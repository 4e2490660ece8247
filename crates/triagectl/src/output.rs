//! Output formatting - ASCII-only terminal output

use owo_colors::OwoColorize;
use std::path::Path;
use triage_common::remediation::RemediationTally;
use triage_common::{Classification, EvidenceRecord, RemediationOutcome, RemediationStep, StepReport, Verdict};

pub const SEPARATOR: &str = "------------------------------------------------------------";

fn colored_verdict(verdict: Verdict) -> String {
    match verdict {
        Verdict::Ok => verdict.label().bright_green().to_string(),
        Verdict::SeeIssues | Verdict::InternalDnsResolutionIssue => {
            verdict.label().yellow().to_string()
        }
        _ => verdict.label().bright_red().to_string(),
    }
}

pub fn format_evidence(evidence: &EvidenceRecord) -> String {
    let mut lines = vec!["[EVIDENCE]".to_string()];
    for line in evidence.format_lines() {
        lines.push(format!("  {}", line));
    }
    lines.join("\n")
}

pub fn format_classification(classification: &Classification) -> String {
    let mut lines = Vec::new();
    lines.push("[ISSUES]".to_string());
    if classification.issues.is_empty() {
        lines.push(format!("  {}", "none".dimmed()));
    } else {
        for issue in &classification.issues {
            lines.push(format!("  * {}", issue));
        }
    }
    lines.push(String::new());
    lines.push(format!(
        "Verdict: {}",
        colored_verdict(classification.verdict)
    ));
    lines.join("\n")
}

pub fn format_step_reports(reports: &[StepReport]) -> String {
    let mut lines = vec!["[REMEDIATION]".to_string()];
    for report in reports {
        let symbol = match report.outcome {
            RemediationOutcome::ExecutedSuccess => report.outcome.symbol().bright_green().to_string(),
            RemediationOutcome::ExecutedFailure => report.outcome.symbol().bright_red().to_string(),
            RemediationOutcome::Skipped => report.outcome.symbol().dimmed().to_string(),
        };
        let mut line = format!("  {} {}", symbol, report.name);
        if let Some(ref err) = report.error {
            line.push_str(&format!(" - {}", err));
        }
        lines.push(line);
    }
    lines.push(String::new());
    lines.push(RemediationTally::from_reports(reports).format());
    lines.join("\n")
}

pub fn format_catalog(steps: &[RemediationStep]) -> String {
    let mut lines = Vec::new();
    for (i, step) in steps.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, step.name.bright_white()));
        lines.push(format!("   Prompt: {}", step.prompt));
        lines.push(format!("   Runs:   {}", step.describe_actions().dimmed()));
    }
    lines.join("\n")
}

pub fn display_header(title: &str) {
    println!();
    println!("{}", title.bright_white().bold());
    println!("{}", SEPARATOR.dimmed());
}

pub fn display_session(root: &Path) {
    println!("Session: {}", root.display().to_string().cyan());
}

pub fn display_warning(message: &str) {
    eprintln!("[WARNING] {}", message.yellow());
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_common::{default_steps, Issue};

    #[test]
    fn test_format_classification_lists_issues() {
        let c = Classification {
            issues: vec![Issue::new("likely DNS issue")],
            verdict: Verdict::SeeIssues,
        };
        let text = format_classification(&c);
        assert!(text.contains("* likely DNS issue"));
        assert!(text.contains("See issues"));
    }

    #[test]
    fn test_format_classification_no_issues() {
        let c = Classification {
            issues: vec![],
            verdict: Verdict::Ok,
        };
        let text = format_classification(&c);
        assert!(text.contains("none"));
        assert!(text.contains("OK"));
    }

    #[test]
    fn test_format_step_reports_includes_tally_and_error() {
        let reports = vec![
            StepReport {
                name: "Flush DNS cache".to_string(),
                outcome: RemediationOutcome::ExecutedSuccess,
                artifact: None,
                error: None,
            },
            StepReport {
                name: "Reset Winsock catalog".to_string(),
                outcome: RemediationOutcome::ExecutedFailure,
                artifact: None,
                error: Some("`netsh winsock reset` exited with code 1".to_string()),
            },
        ];
        let text = format_step_reports(&reports);
        assert!(text.contains("Reset Winsock catalog - `netsh winsock reset` exited with code 1"));
        assert!(text.ends_with("1 succeeded, 1 failed, 0 skipped"));
    }

    #[test]
    fn test_format_catalog_numbers_steps() {
        let text = format_catalog(&default_steps());
        assert!(text.contains("Prompt: Flush DNS cache"));
        assert!(text.contains("Prompt: Clear WinHTTP and user proxy settings"));
        assert_eq!(text.matches("Prompt:").count(), 9);
    }
}
