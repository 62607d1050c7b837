use crate::error::{FetchFailure, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::redirect::Policy;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "Spyglass/0.1 (+https://github.com/spyglass-sec/spyglass)";
const MAX_REDIRECTS: usize = 10;

/// A single GET to issue through a [`Fetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    /// Appended to any query string already present on `url`.
    pub query: Vec<(String, String)>,
    pub follow_redirects: bool,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            follow_redirects: true,
        }
    }

    pub fn with_query<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn without_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    /// Header names are stored lower-cased; the first value wins.
    pub headers: BTreeMap<String, String>,
    pub final_url: String,
    pub body: String,
}

impl FetchResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn is_html(&self) -> bool {
        self.content_type()
            .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
            .unwrap_or(false)
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }
}

/// The HTTP capability shared by the crawler and every probe.
///
/// Implementations must tolerate being called many times for the same URL and
/// must report every transport problem as a [`FetchFailure`] instead of
/// panicking.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        request: &FetchRequest,
    ) -> std::result::Result<FetchResponse, FetchFailure>;
}

/// reqwest-backed fetcher with a bounded per-request timeout and no retries.
pub struct HttpFetcher {
    client: Client,
    no_redirect_client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: Self::build_client(timeout_secs, Policy::limited(MAX_REDIRECTS))?,
            no_redirect_client: Self::build_client(timeout_secs, Policy::none())?,
        })
    }

    fn build_client(timeout_secs: u64, redirect: Policy) -> Result<Client> {
        let timeout = Duration::from_secs(timeout_secs.max(1));
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .connect_timeout(timeout / 2)
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(redirect)
            .build()?;
        Ok(client)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        request: &FetchRequest,
    ) -> std::result::Result<FetchResponse, FetchFailure> {
        debug!("Fetching {} ({} query pairs)", request.url, request.query.len());

        let client = if request.follow_redirects {
            &self.client
        } else {
            &self.no_redirect_client
        };

        let mut builder = client.get(&request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        let response = builder.send().await?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let mut headers = BTreeMap::new();
        for (name, value) in response.headers() {
            headers
                .entry(name.as_str().to_string())
                .or_insert_with(|| String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        let body = response.text().await?;

        Ok(FetchResponse {
            status,
            headers,
            final_url,
            body,
        })
    }
}
