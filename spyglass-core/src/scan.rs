use crate::error::{CoreError, Result};
use crate::finding::Finding;
use crate::security::{ProbeSettings, TargetProgressCallback, run_security_tests};
use indicatif::{ProgressBar, ProgressStyle};
use spyglass_scanner::crawler::{DEFAULT_MAX_DEPTH, DEFAULT_WORKERS, ProgressCallback};
use spyglass_scanner::fetcher::DEFAULT_TIMEOUT_SECS;
use spyglass_scanner::{Crawler, DiscoveredSurface, Fetcher};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

/// Options for configuring a crawl-and-probe run
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub target: String,
    pub max_depth: usize,
    pub workers: usize,
    pub timeout_secs: u64,
    pub probe: ProbeSettings,
    pub show_progress: bool,
}

impl ScanOptions {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            max_depth: DEFAULT_MAX_DEPTH,
            workers: DEFAULT_WORKERS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            probe: ProbeSettings::default(),
            show_progress: false,
        }
    }

    /// Rejects settings that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(CoreError::Config("workers must be at least 1".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(CoreError::Config("timeout must be at least 1 second".to_string()));
        }
        if self.probe.burst_requests == 0 {
            return Err(CoreError::Config("burst must be at least 1 request".to_string()));
        }
        Ok(())
    }
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

fn spinner(enabled: bool, message: &str) -> Option<Arc<ProgressBar>> {
    if !enabled {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    Some(Arc::new(pb))
}

/// Crawl the target and return the discovered surface
pub async fn discover_targets(
    fetcher: Arc<dyn Fetcher>,
    options: &ScanOptions,
) -> Result<DiscoveredSurface> {
    options.validate()?;
    let progress_bar = spinner(options.show_progress, "Starting crawl...");
    let processed = Arc::new(AtomicUsize::new(0));

    let mut crawler = Crawler::new(fetcher)
        .with_max_depth(options.max_depth)
        .with_workers(options.workers);

    if let Some(ref pb) = progress_bar {
        let pb = pb.clone();
        let processed = processed.clone();
        let callback: ProgressCallback = Arc::new(move |depth: usize, url: String| {
            let count = processed.fetch_add(1, Ordering::Relaxed) + 1;
            pb.set_message(format!(
                "Crawling... {} URLs processed (depth {}: {})",
                count,
                depth,
                extract_url_path(&url)
            ));
        });
        crawler = crawler.with_progress_callback(callback);
    }

    let result = crawler.crawl(&options.target).await;

    if let Some(ref pb) = progress_bar {
        pb.finish_and_clear();
    }

    Ok(result?)
}

/// Run the probe battery over every discovered target
pub async fn probe_targets(
    fetcher: Arc<dyn Fetcher>,
    surface: &DiscoveredSurface,
    options: &ScanOptions,
) -> Vec<Finding> {
    let progress_bar = spinner(options.show_progress, "Running security tests...");
    let total = surface.targets().len();

    let callback: Option<TargetProgressCallback> = progress_bar.as_ref().map(|pb| {
        let pb = pb.clone();
        let done = Arc::new(AtomicUsize::new(0));
        let callback: TargetProgressCallback = Arc::new(move |url: &str| {
            let count = done.fetch_add(1, Ordering::Relaxed) + 1;
            pb.set_message(format!(
                "Probed {}/{} targets ({})",
                count,
                total,
                extract_url_path(url)
            ));
        });
        callback
    });

    let findings = run_security_tests(
        fetcher.as_ref(),
        surface,
        options.workers,
        &options.probe,
        callback,
    )
    .await;

    if let Some(ref pb) = progress_bar {
        pb.finish_and_clear();
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_url_path() {
        assert_eq!(extract_url_path("https://example.com"), "/");
        assert_eq!(extract_url_path("https://example.com/a/b?x=1"), "/a/b");
        assert_eq!(extract_url_path("not a url"), "not a url");
    }

    #[test]
    fn test_scan_options_defaults() {
        let options = ScanOptions::new("https://example.com");
        assert_eq!(options.max_depth, 2);
        assert_eq!(options.workers, 8);
        assert_eq!(options.timeout_secs, 10);
        assert_eq!(options.probe.burst_requests, 12);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_zero_workers_is_a_config_error() {
        let options = ScanOptions {
            workers: 0,
            ..ScanOptions::new("https://example.com")
        };
        assert!(matches!(options.validate(), Err(CoreError::Config(_))));
    }
}
