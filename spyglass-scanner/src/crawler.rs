use crate::error::{Result, ScanError};
use crate::extractor::{Extractor, HtmlExtractor, is_internal};
use crate::fetcher::{FetchRequest, FetchResponse, Fetcher};
use crate::surface::{DiscoveredSurface, FrontierEntry};
use futures::stream::{self, StreamExt};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::{Origin, Url};

pub const DEFAULT_MAX_DEPTH: usize = 2;
pub const DEFAULT_WORKERS: usize = 8;

/// Called once per URL right before it is fetched, with its frontier depth.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// Breadth-first crawler over same-origin links.
///
/// Each depth level is drained from the frontier in FIFO order and checked
/// against the visited set by the driving task alone, then fetched with up to
/// `workers` requests in flight. Responses are merged back in frontier order,
/// so the discovered surface does not depend on response timing.
pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    visited: Arc<Mutex<HashSet<String>>>,
    max_depth: usize,
    workers: usize,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            extractor: Arc::new(HtmlExtractor::new()),
            visited: Arc::new(Mutex::new(HashSet::new())),
            max_depth: DEFAULT_MAX_DEPTH,
            workers: DEFAULT_WORKERS,
            progress_callback: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub async fn crawl(&self, start_url: &str) -> Result<DiscoveredSurface> {
        let start = parse_start_url(start_url)?;
        let origin = start.origin();
        info!(
            "Starting crawl of {} (max depth {}, {} workers)",
            start, self.max_depth, self.workers
        );

        let mut visited = self.visited.lock().await;
        visited.clear();

        let mut surface = DiscoveredSurface::new();
        let mut frontier = VecDeque::from([FrontierEntry::new(start.as_str(), 0)]);

        while !frontier.is_empty() {
            // Every queued entry shares one depth, so this drains exactly one level
            let level: Vec<FrontierEntry> = frontier
                .drain(..)
                .filter(|entry| entry.depth <= self.max_depth && visited.insert(entry.url.clone()))
                .collect();

            debug!("Fetching {} URLs at this level", level.len());

            let fetcher = self.fetcher.as_ref();
            let progress = self.progress_callback.as_ref();
            let fetched: Vec<_> = stream::iter(level)
                .map(|entry| async move {
                    if let Some(callback) = progress {
                        callback(entry.depth, entry.url.clone());
                    }
                    let response = fetcher.fetch(&FetchRequest::get(entry.url.as_str())).await;
                    (entry, response)
                })
                .buffered(self.workers)
                .collect()
                .await;

            for (entry, response) in fetched {
                match response {
                    Ok(response) => {
                        let discovered = self.absorb_page(&mut surface, &entry, &response, &origin);
                        for link in discovered {
                            if !visited.contains(&link) && entry.depth < self.max_depth {
                                frontier.push_back(FrontierEntry::new(link, entry.depth + 1));
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Crawl error for {}: {}", entry.url, e);
                    }
                }
            }
        }

        surface.reaffirm_api_endpoints();

        info!(
            "Crawl complete. Visited {} URLs, {}",
            visited.len(),
            surface.summary_line()
        );
        Ok(surface)
    }

    /// Records one fetched page and returns the internal links it points at.
    fn absorb_page(
        &self,
        surface: &mut DiscoveredSurface,
        entry: &FrontierEntry,
        response: &FetchResponse,
        origin: &Origin,
    ) -> Vec<String> {
        surface.pages.insert(entry.url.clone());

        if !response.is_html() {
            debug!(
                "Not parsing {} ({})",
                entry.url,
                response.content_type().unwrap_or("no content type")
            );
            return Vec::new();
        }

        let Ok(page_url) = Url::parse(&entry.url) else {
            return Vec::new();
        };

        let extraction = self.extractor.extract(&page_url, &response.body);
        surface.params.extend(extraction.query_params);

        for form in extraction.forms {
            surface.params.extend(form.inputs.iter().cloned());
            surface.endpoints.insert(form.action.clone());
            surface.forms.push(form);
        }

        let mut internal_links = Vec::new();
        for link in extraction.links {
            if !is_internal(&link, origin) {
                debug!("Skipping external link {}", link);
                continue;
            }

            let mut clean = link;
            clean.set_query(None);
            let clean = clean.to_string();
            surface.endpoints.insert(clean.clone());
            internal_links.push(clean);
        }

        internal_links
    }

    pub async fn get_visited_count(&self) -> usize {
        self.visited.lock().await.len()
    }
}

fn parse_start_url(start_url: &str) -> Result<Url> {
    let mut parsed = Url::parse(start_url).map_err(|e| {
        ScanError::InvalidUrl(format!(
            "{} ({}); include a scheme, e.g. https://example.com",
            start_url, e
        ))
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ScanError::UnsupportedScheme(parsed.scheme().to_string()));
    }

    parsed.set_fragment(None);
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchFailure;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn html(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/html")
            .set_body_bytes(body.as_bytes())
    }

    /// Canned responses keyed by URL; unknown URLs fail like a dead host.
    #[derive(Default)]
    struct StubFetcher {
        pages: HashMap<String, FetchResponse>,
        requests: StdMutex<Vec<String>>,
    }

    impl StubFetcher {
        fn page(mut self, url: &str, content_type: &str, body: &str) -> Self {
            let mut response = FetchResponse {
                status: 200,
                final_url: url.to_string(),
                body: body.to_string(),
                ..Default::default()
            };
            response
                .headers
                .insert("content-type".to_string(), content_type.to_string());
            self.pages.insert(url.to_string(), response);
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(
            &self,
            request: &FetchRequest,
        ) -> std::result::Result<FetchResponse, FetchFailure> {
            self.requests.lock().unwrap().push(request.url.clone());
            self.pages
                .get(&request.url)
                .cloned()
                .ok_or_else(|| FetchFailure::new(format!("connection refused: {}", request.url)))
        }
    }

    #[tokio::test]
    async fn test_depth_bounded_crawl_scenario() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html(
                r#"<a href="/a?x=1">A</a><a href="https://external.com/out">ext</a>
                <form action="/login" method="post"><input name="username"/></form>"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(html(r#"<a href="/b">B</a>"#))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(html(r#"<a href="/c">C</a>"#))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/c"))
            .respond_with(html("<p>too deep</p>"))
            .expect(0)
            .mount(&mock_server)
            .await;

        let base = mock_server.uri();
        let fetcher = Arc::new(crate::fetcher::HttpFetcher::new().unwrap());
        let crawler = Crawler::new(fetcher).with_max_depth(2);
        let surface = crawler.crawl(&base).await.unwrap();

        assert!(surface.pages.contains(&format!("{}/", base)));
        assert!(surface.pages.contains(&format!("{}/a", base)));
        assert!(surface.pages.contains(&format!("{}/b", base)));
        assert!(!surface.pages.contains(&format!("{}/c", base)));
        assert_eq!(surface.pages.len(), 3);

        // /c is known as an endpoint but was never fetched
        assert!(surface.endpoints.contains(&format!("{}/c", base)));
        assert!(surface.params.contains("x"));
        assert!(surface.params.contains("username"));
        assert_eq!(surface.forms.len(), 1);
        assert_eq!(surface.forms[0].action, format!("{}/login", base));
        assert_eq!(surface.forms[0].method, "POST");
        assert!(!surface.endpoints.iter().any(|e| e.contains("external.com")));
        assert_eq!(crawler.get_visited_count().await, 3);
    }

    #[tokio::test]
    async fn test_external_links_never_expand_frontier() {
        let mut body = String::new();
        for i in 0..25 {
            body.push_str(&format!(r#"<a href="https://external{}.test/page">x</a>"#, i));
        }
        let fetcher =
            Arc::new(StubFetcher::default().page("https://example.com/", "text/html", &body));
        let crawler = Crawler::new(fetcher.clone());

        let surface = crawler.crawl("https://example.com").await.unwrap();

        assert_eq!(fetcher.requests(), vec!["https://example.com/"]);
        assert_eq!(crawler.get_visited_count().await, 1);
        assert_eq!(surface.pages.len(), 1);
        assert!(surface.endpoints.is_empty());
    }

    #[tokio::test]
    async fn test_each_url_fetched_once_despite_cycles() {
        let fetcher = Arc::new(
            StubFetcher::default()
                .page(
                    "https://example.com/",
                    "text/html",
                    r#"<a href="/a">a</a><a href="/b">b</a><a href="/a#again">a</a>"#,
                )
                .page(
                    "https://example.com/a",
                    "text/html",
                    r#"<a href="/">home</a><a href="/b">b</a>"#,
                )
                .page(
                    "https://example.com/b",
                    "text/html",
                    r#"<a href="/a?ref=b">a</a><a href="/">home</a>"#,
                ),
        );
        let crawler = Crawler::new(fetcher.clone()).with_workers(4);

        let surface = crawler.crawl("https://example.com/").await.unwrap();

        let mut requests = fetcher.requests();
        requests.sort();
        assert_eq!(
            requests,
            vec![
                "https://example.com/",
                "https://example.com/a",
                "https://example.com/b",
            ]
        );
        assert!(surface.params.contains("ref"));
    }

    #[tokio::test]
    async fn test_breadth_first_order_is_preserved() {
        let fetcher = Arc::new(
            StubFetcher::default()
                .page(
                    "https://example.com/",
                    "text/html",
                    r#"<a href="/one">1</a><a href="/two">2</a>"#,
                )
                .page("https://example.com/one", "text/html", r#"<a href="/deep">d</a>"#)
                .page("https://example.com/two", "text/html", "<p>leaf</p>")
                .page("https://example.com/deep", "text/html", "<p>leaf</p>"),
        );
        let order: Arc<StdMutex<Vec<(usize, String)>>> = Arc::new(StdMutex::new(Vec::new()));
        let order_clone = order.clone();
        let crawler = Crawler::new(fetcher)
            .with_workers(1)
            .with_progress_callback(Arc::new(move |depth, url| {
                order_clone.lock().unwrap().push((depth, url));
            }));

        crawler.crawl("https://example.com/").await.unwrap();

        let order = order.lock().unwrap().clone();
        assert_eq!(
            order,
            vec![
                (0, "https://example.com/".to_string()),
                (1, "https://example.com/one".to_string()),
                (1, "https://example.com/two".to_string()),
                (2, "https://example.com/deep".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_identical_forms_on_different_pages_are_kept() {
        let login = r#"<form action="/login" method="post"><input name="username"/></form>"#;
        let fetcher = Arc::new(
            StubFetcher::default()
                .page(
                    "https://example.com/",
                    "text/html",
                    &format!(r#"{}<a href="/a">a</a>"#, login),
                )
                .page("https://example.com/a", "text/html", login),
        );
        let crawler = Crawler::new(fetcher);

        let surface = crawler.crawl("https://example.com/").await.unwrap();

        assert_eq!(surface.forms.len(), 2);
        assert_eq!(surface.forms[0].page, "https://example.com/");
        assert_eq!(surface.forms[1].page, "https://example.com/a");
        assert_eq!(surface.forms[0].action, surface.forms[1].action);
        assert_eq!(surface.forms[0].inputs, surface.forms[1].inputs);
        assert_eq!(surface.endpoints.len(), 2);
    }

    #[tokio::test]
    async fn test_non_html_is_recorded_but_not_parsed() {
        let fetcher = Arc::new(
            StubFetcher::default()
                .page("https://example.com/", "text/html", r#"<a href="/api/data.json">d</a>"#)
                .page(
                    "https://example.com/api/data.json",
                    "application/json",
                    r#"{"link": "<a href='/hidden'>h</a>"}"#,
                ),
        );
        let crawler = Crawler::new(fetcher.clone());

        let surface = crawler.crawl("https://example.com/").await.unwrap();

        assert!(surface.pages.contains("https://example.com/api/data.json"));
        assert!(surface.endpoints.contains("https://example.com/api/data.json"));
        assert!(!fetcher.requests().iter().any(|u| u.ends_with("/hidden")));
    }

    #[tokio::test]
    async fn test_failed_fetch_is_skipped() {
        let fetcher = Arc::new(StubFetcher::default().page(
            "https://example.com/",
            "text/html",
            r#"<a href="/gone">gone</a><a href="/also-gone">gone</a>"#,
        ));
        let crawler = Crawler::new(fetcher.clone());

        let surface = crawler.crawl("https://example.com/").await.unwrap();

        assert_eq!(fetcher.requests().len(), 3);
        assert_eq!(surface.pages.len(), 1);
        // Links were still discovered before the fetch failed
        assert!(surface.endpoints.contains("https://example.com/gone"));
    }

    #[tokio::test]
    async fn test_depth_zero_fetches_only_start() {
        let fetcher = Arc::new(StubFetcher::default().page(
            "https://example.com/",
            "text/html",
            r#"<a href="/a">a</a>"#,
        ));
        let crawler = Crawler::new(fetcher.clone()).with_max_depth(0);

        let surface = crawler.crawl("https://example.com/").await.unwrap();

        assert_eq!(fetcher.requests(), vec!["https://example.com/"]);
        assert!(surface.endpoints.contains("https://example.com/a"));
    }

    #[tokio::test]
    async fn test_start_url_without_scheme_is_rejected() {
        let crawler = Crawler::new(Arc::new(StubFetcher::default()));

        let err = crawler.crawl("example.com").await.unwrap_err();
        assert!(matches!(err, ScanError::InvalidUrl(_)));

        let err = crawler.crawl("ftp://example.com/").await.unwrap_err();
        assert!(matches!(err, ScanError::UnsupportedScheme(_)));
    }
}
