pub mod probes;
pub mod tables;

use crate::finding::Finding;
use async_trait::async_trait;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use spyglass_scanner::{DiscoveredSurface, FetchFailure, FetchRequest, FetchResponse, Fetcher};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

pub use probes::{
    build_param_map, check_auth_exposure, check_directory_traversal, check_open_redirect,
    check_rate_limit, check_reflected_xss, check_security_headers, check_sql_injection,
};

/// Called after all probes for one target have finished.
pub type TargetProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Sequential requests issued by the rate-limit probe.
    pub burst_requests: usize,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            burst_requests: tables::DEFAULT_BURST_REQUESTS,
        }
    }
}

/// The fixed probe battery. The serialized name is a finding's `test` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    SqlInjection,
    Xss,
    OpenRedirect,
    SecurityHeaders,
    DirectoryTraversal,
    AuthRequiredEndpoint,
    RateLimit,
}

impl ProbeKind {
    /// Every probe, in the order findings for one target are reported.
    pub const ALL: [ProbeKind; 7] = [
        ProbeKind::SqlInjection,
        ProbeKind::Xss,
        ProbeKind::OpenRedirect,
        ProbeKind::SecurityHeaders,
        ProbeKind::DirectoryTraversal,
        ProbeKind::AuthRequiredEndpoint,
        ProbeKind::RateLimit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::SqlInjection => "sql_injection",
            ProbeKind::Xss => "xss",
            ProbeKind::OpenRedirect => "open_redirect",
            ProbeKind::SecurityHeaders => "security_headers",
            ProbeKind::DirectoryTraversal => "directory_traversal",
            ProbeKind::AuthRequiredEndpoint => "auth_required_endpoint",
            ProbeKind::RateLimit => "rate_limit",
        }
    }

    pub async fn run(
        self,
        fetcher: &dyn Fetcher,
        url: &str,
        params: &[String],
        settings: &ProbeSettings,
    ) -> Vec<Finding> {
        match self {
            ProbeKind::SqlInjection => check_sql_injection(fetcher, url, params).await,
            ProbeKind::Xss => check_reflected_xss(fetcher, url, params).await,
            ProbeKind::OpenRedirect => check_open_redirect(fetcher, url, params).await,
            ProbeKind::SecurityHeaders => check_security_headers(fetcher, url).await,
            ProbeKind::DirectoryTraversal => check_directory_traversal(fetcher, url, params).await,
            ProbeKind::AuthRequiredEndpoint => check_auth_exposure(fetcher, url).await,
            ProbeKind::RateLimit => check_rate_limit(fetcher, url, settings).await,
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs every probe against one target and returns findings in probe order.
pub async fn probe_target(
    fetcher: &dyn Fetcher,
    url: &str,
    params: &[String],
    settings: &ProbeSettings,
) -> Vec<Finding> {
    debug!("Probing {}", url);
    join_all(
        ProbeKind::ALL
            .iter()
            .map(|probe| probe.run(fetcher, url, params, settings)),
    )
    .await
    .into_iter()
    .flatten()
    .collect()
}

/// Caps the number of requests in flight across every probe of every target.
struct ThrottledFetcher<'a> {
    inner: &'a dyn Fetcher,
    permits: Semaphore,
}

impl<'a> ThrottledFetcher<'a> {
    fn new(inner: &'a dyn Fetcher, workers: usize) -> Self {
        Self {
            inner,
            permits: Semaphore::new(workers.max(1)),
        }
    }
}

#[async_trait]
impl Fetcher for ThrottledFetcher<'_> {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchFailure> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| FetchFailure::new(e.to_string()))?;
        self.inner.fetch(request).await
    }
}

/// Probes the sorted union of discovered pages and endpoints.
///
/// At most `workers` requests are in flight at once, whichever targets and
/// probes they belong to. Findings come back grouped by target in sorted
/// order, then by probe order within a target.
pub async fn run_security_tests(
    fetcher: &dyn Fetcher,
    surface: &DiscoveredSurface,
    workers: usize,
    settings: &ProbeSettings,
    progress: Option<TargetProgressCallback>,
) -> Vec<Finding> {
    let targets = surface.targets();
    let params = surface.param_names();
    let params = params.as_slice();
    let progress = progress.as_ref();
    let throttled = ThrottledFetcher::new(fetcher, workers);
    let fetcher: &dyn Fetcher = &throttled;

    info!(
        "Running {} probes against {} targets with {} known params",
        ProbeKind::ALL.len(),
        targets.len(),
        params.len()
    );

    let per_target: Vec<Vec<Finding>> = stream::iter(targets.iter())
        .map(|target| async move {
            let findings = probe_target(fetcher, target, params, settings).await;
            if let Some(callback) = progress {
                callback(target.as_str());
            }
            findings
        })
        .buffered(workers.max(1))
        .collect()
        .await;

    per_target.into_iter().flatten().collect()
}
