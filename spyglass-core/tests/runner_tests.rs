// Tests for the external stage runners

use spyglass_core::config::SecurityConfig;
use spyglass_core::runner::{
    ExecutionStatus, MISSING_COMMAND_MESSAGE, Stage, StageReport, run_commands, run_stage,
};
use std::collections::BTreeMap;
use tempfile::TempDir;

fn commands(list: &[&str]) -> Vec<String> {
    list.iter().map(|c| c.to_string()).collect()
}

#[tokio::test]
async fn test_run_commands_records_each_outcome() {
    let workdir = TempDir::new().unwrap();
    let execution = run_commands(
        Stage::Sast,
        &commands(&["echo hello", "sh -c 'echo oops >&2; exit 3'", "no-such-tool-7c1e --scan"]),
        workdir.path(),
    )
    .await;

    assert_eq!(execution.len(), 3);

    assert_eq!(execution[0].status, ExecutionStatus::Passed);
    assert_eq!(execution[0].returncode, Some(0));
    assert_eq!(execution[0].stdout.as_deref(), Some("hello\n"));

    assert_eq!(execution[1].status, ExecutionStatus::Failed);
    assert_eq!(execution[1].returncode, Some(3));
    assert_eq!(execution[1].stderr.as_deref(), Some("oops\n"));

    assert_eq!(execution[2].status, ExecutionStatus::Warning);
    assert_eq!(execution[2].message.as_deref(), Some(MISSING_COMMAND_MESSAGE));
    assert!(execution[2].returncode.is_none());
}

#[tokio::test]
async fn test_commands_run_in_workdir() {
    let workdir = TempDir::new().unwrap();
    std::fs::write(workdir.path().join("marker.txt"), "present").unwrap();

    let execution = run_commands(Stage::Sca, &commands(&["cat marker.txt"]), workdir.path()).await;

    assert_eq!(execution[0].status, ExecutionStatus::Passed);
    assert_eq!(execution[0].stdout.as_deref(), Some("present"));
}

#[tokio::test]
async fn test_output_is_truncated_to_tail() {
    let workdir = TempDir::new().unwrap();
    let execution = run_commands(
        Stage::Dast,
        &commands(&["seq 1 5000"]),
        workdir.path(),
    )
    .await;

    let stdout = execution[0].stdout.clone().unwrap();
    assert_eq!(stdout.chars().count(), 2000);
    assert!(stdout.ends_with("4999\n5000\n"));
}

#[tokio::test]
async fn test_run_stage_writes_report_with_findings() {
    let workdir = TempDir::new().unwrap();
    let reports = workdir.path().join("reports");
    let mut stage_commands = BTreeMap::new();
    stage_commands.insert("api_fuzz".to_string(), commands(&["true", "false"]));
    let config = SecurityConfig {
        commands: stage_commands,
        ..Default::default()
    };

    let (report, path) = run_stage(Stage::ApiFuzz, &config, workdir.path(), &reports)
        .await
        .unwrap();

    assert_eq!(path, reports.join("api_fuzz.json"));
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].title, "API fuzz command failed");
    assert_eq!(report.findings[0].details, "false");

    let written: StageReport =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written, report);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["stage"], "api_fuzz");
    assert_eq!(raw["findings"][0]["severity"], "high");
    assert_eq!(raw["execution"][1]["status"], "failed");
}

#[tokio::test]
async fn test_stage_without_commands_writes_empty_report() {
    let workdir = TempDir::new().unwrap();
    let (report, path) = run_stage(
        Stage::Sast,
        &SecurityConfig::default(),
        workdir.path(),
        workdir.path(),
    )
    .await
    .unwrap();

    assert!(report.findings.is_empty());
    assert!(report.execution.is_empty());
    assert!(path.exists());
}
