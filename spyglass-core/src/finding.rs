use crate::security::ProbeKind;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation made by a single probe invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub test: ProbeKind,
    pub severity: Severity,
    pub url: String,
    pub evidence: String,
}

impl Finding {
    pub fn new(
        test: ProbeKind,
        severity: Severity,
        url: impl Into<String>,
        evidence: impl Into<String>,
    ) -> Self {
        Self {
            test,
            severity,
            url: url.into(),
            evidence: evidence.into(),
        }
    }

    /// Low-severity note that a probe request never got a response.
    pub fn request_failed(
        test: ProbeKind,
        url: impl Into<String>,
        error: impl fmt::Display,
    ) -> Self {
        Self::new(test, Severity::Low, url, format!("Request failed: {}", error))
    }
}
