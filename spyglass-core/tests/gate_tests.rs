// Tests for the aggregate gate over stage report directories

use spyglass_core::config::GateConfig;
use spyglass_core::gate::{
    AGGREGATE_FILE_NAME, AggregateReport, build_aggregate, load_stage_reports, summarize_findings,
    write_aggregate,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn reports_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "sast.json",
        r#"{"stage": "sast", "findings": [{"severity": "HIGH", "title": "x"}], "execution": []}"#,
    );
    write(
        dir.path(),
        "dast.json",
        r#"{"stage": "dast", "findings": [{"severity": "medium"}, {"title": "no severity"}], "execution": []}"#,
    );
    dir
}

#[test]
fn test_summary_lowercases_and_counts_unknown() {
    let dir = reports_dir();
    let reports = load_stage_reports(dir.path()).unwrap();
    let summary = summarize_findings(&reports);

    assert_eq!(reports.len(), 2);
    assert_eq!(summary.get("high"), Some(&1));
    assert_eq!(summary.get("medium"), Some(&1));
    assert_eq!(summary.get("unknown"), Some(&1));
}

#[test]
fn test_reports_load_in_name_order() {
    let dir = reports_dir();
    let reports = load_stage_reports(dir.path()).unwrap();

    let stages: Vec<_> = reports.iter().map(|r| r.stage.clone().unwrap()).collect();
    assert_eq!(stages, vec!["dast", "sast"]);
}

#[test]
fn test_own_outputs_and_non_json_are_skipped() {
    let dir = reports_dir();
    write(dir.path(), AGGREGATE_FILE_NAME, r#"{"report_count": 9}"#);
    write(dir.path(), "coverage.json", r#"{"total_attack_classes": 41}"#);
    write(dir.path(), "notes.txt", "not a report");

    let reports = load_stage_reports(dir.path()).unwrap();
    assert_eq!(reports.len(), 2);
}

#[test]
fn test_malformed_report_is_an_error() {
    let dir = reports_dir();
    write(dir.path(), "sca.json", "{ broken");

    assert!(load_stage_reports(dir.path()).is_err());
}

#[test]
fn test_default_policy_passes_high_only() {
    let dir = reports_dir();
    let aggregate = build_aggregate(dir.path(), GateConfig::default()).unwrap();

    assert!(aggregate.gate.passed);
    assert_eq!(aggregate.gate.reason, "gate passed");
    assert_eq!(aggregate.report_count, 2);
}

#[test]
fn test_fail_on_high_blocks() {
    let dir = reports_dir();
    let policy = GateConfig {
        fail_on_high: true,
        fail_on_critical: true,
    };
    let aggregate = build_aggregate(dir.path(), policy).unwrap();

    assert!(!aggregate.gate.passed);
    assert_eq!(aggregate.gate.reason, "high findings present");
}

#[test]
fn test_critical_blocks_by_default() {
    let dir = reports_dir();
    write(
        dir.path(),
        "sca.json",
        r#"{"stage": "sca", "findings": [{"severity": "critical"}], "execution": []}"#,
    );
    let aggregate = build_aggregate(dir.path(), GateConfig::default()).unwrap();

    assert!(!aggregate.gate.passed);
    assert_eq!(aggregate.gate.reason, "critical findings present");
}

#[test]
fn test_empty_directory_passes() {
    let dir = TempDir::new().unwrap();
    let aggregate = build_aggregate(dir.path(), GateConfig::default()).unwrap();

    assert_eq!(aggregate.report_count, 0);
    assert!(aggregate.severity_summary.is_empty());
    assert!(aggregate.gate.passed);
}

#[test]
fn test_aggregate_is_written_and_ignored_on_rerun() {
    let dir = reports_dir();
    let first = build_aggregate(dir.path(), GateConfig::default()).unwrap();
    let path = write_aggregate(&first, dir.path()).unwrap();

    let written: AggregateReport =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written, first);

    let second = build_aggregate(dir.path(), GateConfig::default()).unwrap();
    assert_eq!(second.report_count, 2);
}

#[test]
fn test_missing_directory_has_no_reports() {
    let dir = TempDir::new().unwrap();
    let reports = dir.path().join("not-created-yet");

    let aggregate = build_aggregate(&reports, GateConfig::default()).unwrap();
    assert_eq!(aggregate.report_count, 0);

    let path = write_aggregate(&aggregate, &reports).unwrap();
    assert!(path.exists());
}
