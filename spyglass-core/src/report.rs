// Report aggregation and rendering

use crate::error::{CoreError, Result};
use crate::finding::{Finding, Severity};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub const DEFAULT_REPORT_PATH: &str = "security-report.json";

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";
const THIN_RULE: &str = "────────────────────────────────────────────────────────────────────────────────\n";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn tally<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            match finding.severity {
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

/// Final scan output, written once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub target: String,
    pub issues: Vec<Finding>,
    pub summary: SeverityCounts,
}

/// Builds the report for one target, keeping findings in the order given.
pub fn aggregate(target: &str, issues: Vec<Finding>) -> Report {
    let summary = SeverityCounts::tally(&issues);
    Report {
        target: target.to_string(),
        issues,
        summary,
    }
}

/// Aggregates `issues` and writes the report to `path` as pretty JSON.
pub fn generate_report(target: &str, issues: Vec<Finding>, path: &Path) -> Result<Report> {
    let report = aggregate(target, issues);
    let json = serde_json::to_string_pretty(&report).map_err(|e| CoreError::json(path, e))?;
    save_report(&json, path).map_err(|e| CoreError::io(path, e))?;
    Ok(report)
}

pub fn generate_text_report(report: &Report) -> String {
    let mut text = String::new();

    text.push_str(RULE);
    text.push_str("                        SPYGLASS SECURITY SCAN REPORT\n");
    text.push_str(RULE);
    text.push('\n');

    text.push_str(&format!("Target:         {}\n", report.target));
    text.push_str(&format!("Total Findings: {}\n\n", report.summary.total()));

    if report.summary.high > 0 {
        text.push_str(&format!("  [HIGH]     {}  (High priority)\n", report.summary.high));
    }
    if report.summary.medium > 0 {
        text.push_str(&format!("  [MEDIUM]   {}  (Should be addressed)\n", report.summary.medium));
    }
    if report.summary.low > 0 {
        text.push_str(&format!("  [LOW]      {}  (Probe diagnostics)\n", report.summary.low));
    }
    text.push('\n');

    if !report.issues.is_empty() {
        text.push_str(RULE);
        text.push_str("DETAILED FINDINGS\n");
        text.push_str(RULE);
        text.push('\n');

        for (idx, finding) in report.issues.iter().enumerate() {
            text.push_str(&format!("[{}] {}\n", idx + 1, format_test_name(finding.test.as_str())));
            text.push_str(&format!("Severity:     {}\n", finding.severity.as_str().to_uppercase()));
            text.push_str(&format!("URL:          {}\n", finding.url));
            text.push_str("\nEvidence:\n");
            text.push_str(&wrap_text(&finding.evidence, 80, "  "));
            text.push('\n');
            text.push_str(THIN_RULE);
            text.push('\n');
        }
    }

    text.push_str(RULE);
    text.push_str("\nGenerated by Spyglass - a lightweight website crawl-and-probe scanner\n");
    text.push_str("For authorized security testing only.\n\n");

    text
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn format_test_name(test: &str) -> String {
    test.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn wrap_text(text: &str, width: usize, indent: &str) -> String {
    let mut result = String::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.len() + word.len() + 1 > width - indent.len() && !current_line.is_empty() {
            result.push_str(indent);
            result.push_str(&current_line);
            result.push('\n');
            current_line.clear();
        }

        if !current_line.is_empty() {
            current_line.push(' ');
        }
        current_line.push_str(word);
    }

    if !current_line.is_empty() {
        result.push_str(indent);
        result.push_str(&current_line);
        result.push('\n');
    }

    result
}
