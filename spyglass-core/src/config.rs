use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_CONFIG_PATH: &str = "security/config.json";
pub const DEFAULT_REPORTS_DIR: &str = "security/reports";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub fail_on_high: bool,
    pub fail_on_critical: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            fail_on_high: false,
            fail_on_critical: true,
        }
    }
}

/// Settings shared by the stage runners and the aggregate gate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Shell commands per stage name (`sast`, `sca`, `dast`, `api_fuzz`).
    pub commands: BTreeMap<String, Vec<String>>,
    pub gates: GateConfig,
}

impl SecurityConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        serde_json::from_str(&raw).map_err(|e| CoreError::json(path, e))
    }

    /// Like [`SecurityConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn commands_for(&self, stage: &str) -> &[String] {
        self.commands.get(stage).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Expands a leading `~` in a user-supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
