use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use url::Url;

/// An HTML form seen while crawling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    /// Page the form was found on.
    pub page: String,
    /// Absolute action URL, fragment removed.
    pub action: String,
    /// Upper-cased; `GET` when the form does not say.
    pub method: String,
    /// Names of the form's named `<input>` elements, in document order.
    pub inputs: Vec<String>,
}

/// (url, depth) pair awaiting a visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: String,
    pub depth: usize,
}

impl FrontierEntry {
    pub fn new(url: impl Into<String>, depth: usize) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}

/// Everything a crawl discovered. Built by the crawler, read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredSurface {
    pub pages: BTreeSet<String>,
    pub endpoints: BTreeSet<String>,
    pub params: BTreeSet<String>,
    /// Discovery order; identical forms on different pages are kept.
    pub forms: Vec<Form>,
}

impl DiscoveredSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorted, de-duplicated union of pages and endpoints.
    pub fn targets(&self) -> Vec<String> {
        self.pages.union(&self.endpoints).cloned().collect()
    }

    pub fn param_names(&self) -> Vec<String> {
        self.params.iter().cloned().collect()
    }

    /// Re-mark already known URLs that look like API resources as endpoints.
    ///
    /// Only URLs already present in `pages` or `endpoints` are considered, so
    /// this never adds a new target to the probe run.
    pub fn reaffirm_api_endpoints(&mut self) {
        let api_like: Vec<String> = self
            .endpoints
            .iter()
            .chain(self.pages.iter())
            .filter(|candidate| looks_like_api(candidate))
            .cloned()
            .collect();
        self.endpoints.extend(api_like);
    }

    pub fn summary_line(&self) -> String {
        format!(
            "pages={}, forms={}, params={}, endpoints={}",
            self.pages.len(),
            self.forms.len(),
            self.params.len(),
            self.endpoints.len()
        )
    }
}

fn looks_like_api(candidate: &str) -> bool {
    let path = Url::parse(candidate)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_default();
    path.contains("/api") || path.ends_with(".json")
}
