// Stage runners that shell out to external SAST/SCA/DAST/API fuzz tools

use crate::config::SecurityConfig;
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::process::Command;
use tracing::{info, warn};

/// Captured stdout/stderr is trimmed to this many trailing characters.
pub const OUTPUT_TAIL_CHARS: usize = 2000;
pub const MISSING_COMMAND_MESSAGE: &str = "command not found; stage output may be incomplete";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Sast,
    Sca,
    Dast,
    ApiFuzz,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Sast, Stage::Sca, Stage::Dast, Stage::ApiFuzz];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Sast => "sast",
            Stage::Sca => "sca",
            Stage::Dast => "dast",
            Stage::ApiFuzz => "api_fuzz",
        }
    }

    pub fn failure_title(&self) -> &'static str {
        match self {
            Stage::Sast => "SAST command failed",
            Stage::Sca => "SCA command failed",
            Stage::Dast => "DAST command failed",
            Stage::ApiFuzz => "API fuzz command failed",
        }
    }
}

impl FromStr for Stage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "sast" => Ok(Stage::Sast),
            "sca" => Ok(Stage::Sca),
            "dast" => Ok(Stage::Dast),
            "api_fuzz" => Ok(Stage::ApiFuzz),
            _ => Err(CoreError::UnknownStage(s.to_string())),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Passed,
    Failed,
    Warning,
    #[serde(other)]
    Unknown,
}

/// Outcome of one configured command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionEntry {
    pub stage: Stage,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returncode: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

impl ExecutionEntry {
    fn missing_command(stage: Stage, command: &str) -> Self {
        Self {
            stage,
            status: ExecutionStatus::Warning,
            command: Some(command.to_string()),
            message: Some(MISSING_COMMAND_MESSAGE.to_string()),
            returncode: None,
            stdout: None,
            stderr: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFinding {
    pub stage: Stage,
    pub severity: String,
    pub title: String,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: Stage,
    pub findings: Vec<StageFinding>,
    pub execution: Vec<ExecutionEntry>,
}

/// True when the first word of `command` resolves to an executable on `PATH`.
pub fn command_exists(command: &str) -> bool {
    command
        .split_whitespace()
        .next()
        .is_some_and(|binary| which::which(binary).is_ok())
}

/// Keeps the last `max_chars` characters of `text`.
pub fn tail_chars(text: &str, max_chars: usize) -> String {
    let skip = text.chars().count().saturating_sub(max_chars);
    text.chars().skip(skip).collect()
}

pub async fn run_commands(
    stage: Stage,
    commands: &[String],
    workdir: &Path,
) -> Vec<ExecutionEntry> {
    let mut entries = Vec::with_capacity(commands.len());

    for command in commands {
        if !command_exists(command) {
            warn!("[{}] {}: {}", stage, command, MISSING_COMMAND_MESSAGE);
            entries.push(ExecutionEntry::missing_command(stage, command));
            continue;
        }

        info!("[{}] running: {}", stage, command);
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(workdir)
            .output()
            .await;

        let entry = match output {
            Ok(output) => {
                let passed = output.status.success();
                info!(
                    "[{}] {} {}",
                    stage,
                    command,
                    if passed { "passed" } else { "failed" }
                );
                ExecutionEntry {
                    stage,
                    status: if passed {
                        ExecutionStatus::Passed
                    } else {
                        ExecutionStatus::Failed
                    },
                    command: Some(command.clone()),
                    message: None,
                    // Killed by a signal when there is no code
                    returncode: Some(output.status.code().unwrap_or(-1)),
                    stdout: Some(tail_chars(
                        &String::from_utf8_lossy(&output.stdout),
                        OUTPUT_TAIL_CHARS,
                    )),
                    stderr: Some(tail_chars(
                        &String::from_utf8_lossy(&output.stderr),
                        OUTPUT_TAIL_CHARS,
                    )),
                }
            }
            Err(e) => {
                warn!("[{}] could not start {}: {}", stage, command, e);
                ExecutionEntry {
                    stage,
                    status: ExecutionStatus::Failed,
                    command: Some(command.clone()),
                    message: Some(e.to_string()),
                    returncode: None,
                    stdout: None,
                    stderr: None,
                }
            }
        };
        entries.push(entry);
    }

    entries
}

/// One `high` finding per failed command.
pub fn findings_from_execution(stage: Stage, execution: &[ExecutionEntry]) -> Vec<StageFinding> {
    execution
        .iter()
        .filter(|entry| entry.status == ExecutionStatus::Failed)
        .map(|entry| StageFinding {
            stage,
            severity: "high".to_string(),
            title: stage.failure_title().to_string(),
            details: entry.command.clone().unwrap_or_default(),
        })
        .collect()
}

pub fn write_stage_report(report: &StageReport, reports_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(reports_dir).map_err(|e| CoreError::io(reports_dir, e))?;
    let path = reports_dir.join(format!("{}.json", report.stage));
    let json = serde_json::to_string_pretty(report).map_err(|e| CoreError::json(&path, e))?;
    std::fs::write(&path, json).map_err(|e| CoreError::io(&path, e))?;
    Ok(path)
}

/// Runs the stage's configured commands and writes its report.
pub async fn run_stage(
    stage: Stage,
    config: &SecurityConfig,
    workdir: &Path,
    reports_dir: &Path,
) -> Result<(StageReport, PathBuf)> {
    let commands = config.commands_for(stage.as_str());
    if commands.is_empty() {
        warn!("[{}] no commands configured", stage);
    }

    let execution = run_commands(stage, commands, workdir).await;
    let report = StageReport {
        stage,
        findings: findings_from_execution(stage, &execution),
        execution,
    };
    let path = write_stage_report(&report, reports_dir)?;
    Ok((report, path))
}
