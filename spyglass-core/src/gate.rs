// Aggregate gate over independently produced stage reports

use crate::config::GateConfig;
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const AGGREGATE_FILE_NAME: &str = "aggregate.json";

/// Files in the reports directory that are outputs, not stage reports.
const NON_STAGE_FILES: &[&str] = &[AGGREGATE_FILE_NAME, crate::coverage::COVERAGE_FILE_NAME];

/// The parts of a stage report the gate reads. Everything else is ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StageReportSummary {
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub findings: Vec<SeverityOnly>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SeverityOnly {
    #[serde(default)]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    pub passed: bool,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub report_count: usize,
    pub severity_summary: BTreeMap<String, usize>,
    pub gate: GateDecision,
}

/// Reads every stage report in `reports_dir`, in file name order.
///
/// A directory that does not exist yet holds no reports.
pub fn load_stage_reports(reports_dir: &Path) -> Result<Vec<StageReportSummary>> {
    if !reports_dir.exists() {
        debug!("Reports directory {} does not exist", reports_dir.display());
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(reports_dir)
        .map_err(|e| CoreError::io(reports_dir, e))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_none_or(|name| !NON_STAGE_FILES.contains(&name))
        })
        .collect();
    paths.sort();

    paths
        .iter()
        .map(|path| {
            debug!("Loading stage report {}", path.display());
            let raw = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
            serde_json::from_str(&raw).map_err(|e| CoreError::json(path, e))
        })
        .collect()
}

/// Counts findings by lower-cased severity; a missing severity counts as `unknown`.
pub fn summarize_findings(reports: &[StageReportSummary]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for finding in reports.iter().flat_map(|report| &report.findings) {
        let severity = finding
            .severity
            .as_deref()
            .unwrap_or("unknown")
            .to_lowercase();
        *counts.entry(severity).or_insert(0) += 1;
    }
    counts
}

pub fn gate_decision(
    summary: &BTreeMap<String, usize>,
    fail_on_high: bool,
    fail_on_critical: bool,
) -> GateDecision {
    let present = |severity: &str| summary.get(severity).copied().unwrap_or(0) > 0;

    let (passed, reason) = if fail_on_critical && present("critical") {
        (false, "critical findings present")
    } else if fail_on_high && present("high") {
        (false, "high findings present")
    } else {
        (true, "gate passed")
    };

    GateDecision {
        passed,
        reason: reason.to_string(),
    }
}

/// Loads, counts and decides; `policy` is the effective gate policy.
pub fn build_aggregate(reports_dir: &Path, policy: GateConfig) -> Result<AggregateReport> {
    let reports = load_stage_reports(reports_dir)?;
    let severity_summary = summarize_findings(&reports);
    let gate = gate_decision(&severity_summary, policy.fail_on_high, policy.fail_on_critical);

    info!(
        "Gate over {} stage reports: {} ({})",
        reports.len(),
        if gate.passed { "passed" } else { "failed" },
        gate.reason
    );

    Ok(AggregateReport {
        report_count: reports.len(),
        severity_summary,
        gate,
    })
}

pub fn write_aggregate(report: &AggregateReport, reports_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(reports_dir).map_err(|e| CoreError::io(reports_dir, e))?;
    let path = reports_dir.join(AGGREGATE_FILE_NAME);
    let json = serde_json::to_string_pretty(report).map_err(|e| CoreError::json(&path, e))?;
    std::fs::write(&path, json).map_err(|e| CoreError::io(&path, e))?;
    Ok(path)
}
