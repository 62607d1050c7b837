// Attack taxonomy coverage of the security test catalog

use crate::error::{CoreError, Result};
use crate::taxonomy::taxonomy_ids;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_CATALOG_PATH: &str = "security/test-catalog.json";
pub const COVERAGE_FILE_NAME: &str = "coverage.json";

/// One catalog record. Only `attack_id` is interpreted; the rest is carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub attack_id: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CatalogEntry {
    pub fn new(attack_id: impl Into<String>) -> Self {
        Self {
            attack_id: attack_id.into(),
            extra: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub total_attack_classes: usize,
    pub covered_attack_classes: usize,
    pub coverage_percent: f64,
    pub unknown_attack_ids: Vec<String>,
    pub missing_attack_ids: Vec<String>,
}

impl CoverageSummary {
    pub fn has_gap(&self) -> bool {
        !self.unknown_attack_ids.is_empty() || !self.missing_attack_ids.is_empty()
    }
}

pub fn load_catalog(path: &Path) -> Result<Vec<CatalogEntry>> {
    let raw = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
    serde_json::from_str(&raw).map_err(|e| CoreError::json(path, e))
}

pub fn coverage_summary(catalog: &[CatalogEntry]) -> CoverageSummary {
    let mapped: BTreeSet<&str> = catalog.iter().map(|entry| entry.attack_id.as_str()).collect();
    let known = taxonomy_ids();

    let covered = mapped.intersection(&known).count();
    let coverage_percent = if known.is_empty() {
        0.0
    } else {
        (covered as f64 / known.len() as f64 * 10_000.0).round() / 100.0
    };

    CoverageSummary {
        total_attack_classes: known.len(),
        covered_attack_classes: covered,
        coverage_percent,
        unknown_attack_ids: mapped.difference(&known).map(|id| id.to_string()).collect(),
        missing_attack_ids: known.difference(&mapped).map(|id| id.to_string()).collect(),
    }
}

/// Writes the summary to `<reports_dir>/coverage.json`, creating the directory.
pub fn write_coverage(summary: &CoverageSummary, reports_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(reports_dir).map_err(|e| CoreError::io(reports_dir, e))?;
    let path = reports_dir.join(COVERAGE_FILE_NAME);
    let json = serde_json::to_string_pretty(summary).map_err(|e| CoreError::json(&path, e))?;
    std::fs::write(&path, json).map_err(|e| CoreError::io(&path, e))?;
    info!(
        "Coverage {}/{} ({}%) written to {}",
        summary.covered_attack_classes,
        summary.total_attack_classes,
        summary.coverage_percent,
        path.display()
    );
    Ok(path)
}
