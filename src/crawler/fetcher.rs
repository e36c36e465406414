//! HTTP fetcher implementation
//!
//! This module handles all outbound requests made during a crawl:
//! - The [`Fetcher`] trait, the seam tests use to inject canned pages
//! - [`HttpFetcher`], the reqwest-backed production implementation
//! - [`FetchGate`], which applies the global connection ceiling and the
//!   per-request timeout to any fetcher
//!
//! There is no retry logic. A failed fetch becomes a terminal page result.

use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use url::Url;

/// Maximum redirect hops followed for a single request
pub const MAX_REDIRECTS: usize = 10;

/// Why a fetch did not produce a body
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Http(u16),

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not an HTML document: {0}")]
    NotHtml(String),
}

/// Retrieves the body of a URL
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url`, returning the body on a 2xx response
    ///
    /// Used for robots.txt and sitemaps, so any content type is accepted.
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;

    /// Fetches a page for analysis
    ///
    /// Implementations that can see response headers reject non-HTML bodies
    /// with [`FetchError::NotHtml`].
    async fn fetch_page(&self, url: &Url) -> Result<String, FetchError> {
        self.fetch(url).await
    }
}

/// Returns true for `Content-Type` values that carry an HTML document
pub fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}

/// Production fetcher backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(user_agent, timeout)?,
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn get(&self, url: &Url, require_html: bool) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }

        if require_html {
            // Check Content-Type before downloading the body
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();

            if !is_html_content_type(&content_type) {
                return Err(FetchError::NotHtml(content_type));
            }
        }

        response.text().await.map_err(classify_error)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        self.get(url, false).await
    }

    async fn fetch_page(&self, url: &Url) -> Result<String, FetchError> {
        self.get(url, true).await
    }
}

fn classify_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if let Some(status) = e.status() {
        FetchError::Http(status.as_u16())
    } else if e.is_connect() {
        FetchError::Network(format!("Connection failed: {}", e))
    } else {
        FetchError::Network(e.to_string())
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use siteable::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client("SiteAble-Scanner/1.0", Duration::from_secs(10)).unwrap();
/// ```
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Bounds every outbound request of a crawl
///
/// All fetches (pages, robots.txt, sitemaps) pass through the same gate so
/// the number of open connections never exceeds the permit count, however
/// many workers are running.
#[derive(Clone)]
pub struct FetchGate {
    inner: Arc<dyn Fetcher>,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl FetchGate {
    pub fn new(inner: Arc<dyn Fetcher>, max_connections: usize, timeout: Duration) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(max_connections.max(1))),
            timeout,
        }
    }

    /// Fetches `url` while holding one connection permit
    ///
    /// Exceeding the timeout yields [`FetchError::Timeout`].
    pub async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let _permit = self.acquire().await?;
        match tokio::time::timeout(self.timeout, self.inner.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        }
    }

    /// Like [`FetchGate::fetch`], for a page that must be HTML
    pub async fn fetch_page(&self, url: &Url) -> Result<String, FetchError> {
        let _permit = self.acquire().await?;
        match tokio::time::timeout(self.timeout, self.inner.fetch_page(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        }
    }

    async fn acquire(&self) -> Result<tokio::sync::SemaphorePermit<'_>, FetchError> {
        self.permits
            .acquire()
            .await
            .map_err(|_| FetchError::Network("connection permits closed".to_string()))
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

impl std::fmt::Debug for FetchGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchGate")
            .field("available_permits", &self.permits.available_permits())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_build_http_client() {
        let client = build_http_client("TestCrawler/1.0", Duration::from_secs(5));
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_http_fetcher_returns_body_and_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("user-agent", "TestCrawler/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>hi</p>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new("TestCrawler/1.0", Duration::from_secs(5)).unwrap();
        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();
        assert_eq!(fetcher.fetch(&url).await.unwrap(), "<p>hi</p>");
    }

    #[test]
    fn test_html_content_types() {
        assert!(is_html_content_type("text/html"));
        assert!(is_html_content_type("text/html; charset=utf-8"));
        assert!(is_html_content_type("TEXT/HTML"));
        assert!(is_html_content_type("application/xhtml+xml"));
        assert!(!is_html_content_type("application/pdf"));
        assert!(!is_html_content_type("text/plain"));
        assert!(!is_html_content_type(""));
    }

    #[tokio::test]
    async fn test_fetch_page_rejects_non_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/report.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<p>ok</p>", "text/html; charset=utf-8"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new("TestCrawler/1.0", Duration::from_secs(5)).unwrap();
        let pdf = Url::parse(&format!("{}/report.pdf", server.uri())).unwrap();
        let page = Url::parse(&format!("{}/page", server.uri())).unwrap();

        assert_eq!(
            fetcher.fetch_page(&pdf).await,
            Err(FetchError::NotHtml("application/pdf".to_string()))
        );
        assert_eq!(fetcher.fetch_page(&page).await.unwrap(), "<p>ok</p>");
        // robots.txt and sitemaps go through plain fetch, which accepts anything
        assert_eq!(fetcher.fetch(&pdf).await.unwrap(), "%PDF-1.4");
    }

    #[tokio::test]
    async fn test_http_fetcher_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new("TestCrawler/1.0", Duration::from_secs(5)).unwrap();
        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        assert_eq!(fetcher.fetch(&url).await, Err(FetchError::Http(404)));
    }

    #[tokio::test]
    async fn test_http_fetcher_maps_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new("TestCrawler/1.0", Duration::from_millis(200)).unwrap();
        let url = Url::parse(&format!("{}/slow", server.uri())).unwrap();
        assert_eq!(fetcher.fetch(&url).await, Err(FetchError::Timeout));
    }

    #[tokio::test]
    async fn test_http_fetcher_connection_refused_is_network_error() {
        let fetcher = HttpFetcher::new("TestCrawler/1.0", Duration::from_secs(2)).unwrap();
        let url = Url::parse("http://127.0.0.1:1/").unwrap();
        assert!(matches!(fetcher.fetch(&url).await, Err(FetchError::Network(_))));
    }

    struct SlowFetcher {
        active: AtomicUsize,
        peak: AtomicUsize,
        pause: Duration,
    }

    #[async_trait]
    impl Fetcher for SlowFetcher {
        async fn fetch(&self, _url: &Url) -> Result<String, FetchError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.pause).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_gate_bounds_concurrent_fetches() {
        let inner = Arc::new(SlowFetcher {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            pause: Duration::from_millis(50),
        });
        let gate = FetchGate::new(inner.clone(), 2, Duration::from_secs(5));
        let url = Url::parse("https://example.com/").unwrap();

        let mut handles = Vec::new();
        for _ in 0..6 {
            let gate = gate.clone();
            let url = url.clone();
            handles.push(tokio::spawn(async move { gate.fetch(&url).await }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert!(inner.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(gate.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_gate_applies_timeout() {
        let inner = Arc::new(SlowFetcher {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            pause: Duration::from_secs(5),
        });
        let gate = FetchGate::new(inner, 1, Duration::from_millis(50));
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(gate.fetch(&url).await, Err(FetchError::Timeout));
        assert_eq!(gate.available_permits(), 1);
    }
}
