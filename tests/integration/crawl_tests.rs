//! Integration tests for the crawler
//!
//! These tests drive full scans end-to-end, either against an in-memory
//! site behind a mock `Fetcher` or against wiremock HTTP servers.

use async_trait::async_trait;
use siteable::crawler::{FetchError, Fetcher};
use siteable::storage::{SqliteStorage, Storage};
use siteable::{
    scan_site, scan_site_with_fetcher, AnalyzerTable, CrawlReport, FetchStatus, FnAnalyzer, Issue,
    MemorySink, ResultSink, ScanOptions, SqliteSink,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// An in-memory site that records every URL requested from it
struct MockSite {
    pages: HashMap<String, String>,
    latency: Duration,
    requests: Mutex<Vec<String>>,
}

impl MockSite {
    fn new(pages: Vec<(String, String)>) -> Arc<Self> {
        Self::with_latency(pages, Duration::ZERO)
    }

    fn with_latency(pages: Vec<(String, String)>, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            pages: pages.into_iter().collect(),
            latency,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Requests for pages, excluding robots.txt and sitemaps
    fn page_fetches(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| !u.ends_with("/robots.txt") && !u.ends_with(".xml"))
            .cloned()
            .collect()
    }

    fn fetch_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for url in self.page_fetches() {
            *counts.entry(url).or_insert(0) += 1;
        }
        counts
    }
}

#[async_trait]
impl Fetcher for MockSite {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or(FetchError::Http(404))
    }
}

fn page(url: &str, body: impl Into<String>) -> (String, String) {
    (url.to_string(), body.into())
}

fn links(hrefs: &[&str]) -> String {
    hrefs
        .iter()
        .map(|h| format!(r#"<a href="{}">{}</a>"#, h, h))
        .collect()
}

fn options(max_pages: usize, concurrency: usize) -> ScanOptions {
    ScanOptions {
        max_pages,
        concurrency,
        request_timeout: Duration::from_secs(2),
        ..ScanOptions::default()
    }
}

async fn scan(site: Arc<MockSite>, options: ScanOptions) -> CrawlReport {
    tokio::time::timeout(
        Duration::from_secs(10),
        scan_site_with_fetcher(
            "https://example.com/",
            options,
            AnalyzerTable::new(),
            Vec::new(),
            site,
            CancellationToken::new(),
        ),
    )
    .await
    .expect("scan did not terminate")
    .expect("scan failed")
}

/// `/` links to `/p0` .. `/p{n-1}`
fn star_site(n: usize) -> Arc<MockSite> {
    let children: Vec<String> = (0..n).map(|i| format!("/p{}", i)).collect();
    let hrefs: Vec<&str> = children.iter().map(String::as_str).collect();
    let mut pages = vec![page("https://example.com/", links(&hrefs))];
    for child in &children {
        pages.push(page(&format!("https://example.com{}", child), links(&["/"])));
    }
    MockSite::new(pages)
}

/// The four-page site: sitemap lists `/a` and `/b`, `/a` links to `/c`
fn sitemap_site() -> Arc<MockSite> {
    let sitemap = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.com/a</loc></url>
  <url><loc>https://example.com/b</loc></url>
</urlset>"#;
    MockSite::new(vec![
        page("https://example.com/sitemap.xml", sitemap),
        page("https://example.com/", "<html><body>home</body></html>"),
        page("https://example.com/a", links(&["/c"])),
        page("https://example.com/b", ""),
        page("https://example.com/c", ""),
    ])
}

#[tokio::test]
async fn test_sitemap_and_links_each_fetched_once() {
    let site = sitemap_site();
    let report = scan(
        site.clone(),
        ScanOptions {
            delay: Duration::ZERO,
            ..options(10, 2)
        },
    )
    .await;

    let mut fetched = site.page_fetches();
    fetched.sort();
    assert_eq!(
        fetched,
        vec![
            "https://example.com/",
            "https://example.com/a",
            "https://example.com/b",
            "https://example.com/c",
        ]
    );
    assert_eq!(report.results.len(), 4);
    assert!(report.results.values().all(|r| r.fetch_status.is_ok()));
}

#[tokio::test]
async fn test_single_page_budget_fetches_only_start_url() {
    let site = sitemap_site();
    let report = scan(site.clone(), options(1, 2)).await;

    assert_eq!(site.page_fetches(), vec!["https://example.com/"]);
    assert_eq!(report.results.len(), 1);
    assert!(report.results.contains_key("https://example.com/"));
    assert_eq!(report.pages_fetched, 1);
}

#[tokio::test]
async fn test_no_duplicate_fetches_on_dense_graph() {
    // Every page links to every other page, with spelling variants
    let n = 20;
    let all: Vec<String> = (0..n).map(|i| format!("/n{}", i)).collect();
    let mut hrefs: Vec<String> = all.clone();
    hrefs.extend(all.iter().map(|p| format!("https://EXAMPLE.com:443{}#frag", p)));
    hrefs.push("/".to_string());
    let hrefs: Vec<&str> = hrefs.iter().map(String::as_str).collect();
    let body = links(&hrefs);

    let mut pages = vec![page("https://example.com/", body.clone())];
    for p in &all {
        pages.push(page(&format!("https://example.com{}", p), body.clone()));
    }
    let site = MockSite::new(pages);

    let report = scan(site.clone(), options(200, 8)).await;

    let counts = site.fetch_counts();
    assert_eq!(counts.len(), n + 1);
    assert!(counts.values().all(|&c| c == 1), "duplicate fetch: {:?}", counts);
    assert_eq!(report.results.len(), n + 1);
}

#[tokio::test]
async fn test_budget_is_respected() {
    for budget in [0usize, 1, 5, 200] {
        let site = star_site(250);
        let report = scan(site.clone(), options(budget, 4)).await;

        assert_eq!(site.page_fetches().len(), budget, "budget {}", budget);
        assert_eq!(report.pages_fetched, budget);
        assert_eq!(report.results.len(), budget);
    }
}

#[tokio::test]
async fn test_budget_larger_than_site() {
    let site = star_site(3);
    let report = scan(site.clone(), options(200, 4)).await;
    assert_eq!(site.page_fetches().len(), 4);
    assert_eq!(report.results.len(), 4);
}

#[tokio::test]
async fn test_scope_containment() {
    let site = MockSite::new(vec![
        page(
            "https://example.com/",
            links(&[
                "https://other.org/",
                "https://example.org/x",
                "https://blog.example.com/post",
                "mailto:someone@example.com",
            ]),
        ),
        page("https://blog.example.com/post", links(&["https://evil.test/"])),
    ]);
    let report = scan(site.clone(), options(50, 2)).await;

    for url in site.page_fetches() {
        let host = Url::parse(&url).unwrap().host_str().unwrap().to_string();
        assert!(
            host == "example.com" || host.ends_with(".example.com"),
            "fetched out-of-scope {}",
            url
        );
    }
    assert!(report.results.contains_key("https://blog.example.com/post"));
    assert!(!report.results.contains_key("https://other.org/"));

    // External links are still reported
    let home = &report.results["https://example.com/"];
    assert!(home.discovered_links.iter().any(|l| l == "https://other.org/"));
}

#[tokio::test]
async fn test_terminates_on_acyclic_graph() {
    // Binary tree of depth 4
    let mut pages = Vec::new();
    for i in 1..32usize {
        let url = if i == 1 {
            "https://example.com/".to_string()
        } else {
            format!("https://example.com/t{}", i)
        };
        let children = [format!("/t{}", 2 * i), format!("/t{}", 2 * i + 1)];
        let body = if i < 16 {
            links(&[children[0].as_str(), children[1].as_str()])
        } else {
            String::new()
        };
        pages.push(page(&url, body));
    }
    let site = MockSite::new(pages);
    let report = scan(site, options(200, 4)).await;

    assert_eq!(report.results.len(), 31);
    assert!(!report.cancelled);
}

#[tokio::test]
async fn test_terminates_on_cyclic_graph() {
    let site = MockSite::new(vec![
        page("https://example.com/", links(&["/r1"])),
        page("https://example.com/r1", links(&["/r2", "/"])),
        page("https://example.com/r2", links(&["/r1", "/"])),
    ]);
    let report = scan(site.clone(), options(200, 3)).await;

    assert_eq!(report.results.len(), 3);
    assert_eq!(site.page_fetches().len(), 3);
}

#[tokio::test]
async fn test_robots_disallow_blocks_without_spending_budget() {
    let site = MockSite::new(vec![
        page(
            "https://example.com/robots.txt",
            "User-agent: *\nDisallow: /private\n",
        ),
        page("https://example.com/", links(&["/private/a", "/public"])),
        page("https://example.com/public", ""),
        page("https://example.com/private/a", "secret"),
    ]);
    let report = scan(site.clone(), options(2, 1)).await;

    assert!(!site
        .page_fetches()
        .iter()
        .any(|u| u.contains("/private")));
    assert_eq!(
        report.results["https://example.com/private/a"].fetch_status,
        FetchStatus::RobotsBlocked
    );
    assert!(report.results["https://example.com/public"].fetch_status.is_ok());
    assert_eq!(report.pages_fetched, 2);
}

#[tokio::test]
async fn test_cancellation_returns_partial_report() {
    let mut pages = Vec::new();
    for i in 0..50usize {
        let url = if i == 0 {
            "https://example.com/".to_string()
        } else {
            format!("https://example.com/c{}", i)
        };
        pages.push(page(&url, links(&[&format!("/c{}", i + 1)])));
    }
    let site = MockSite::with_latency(pages, Duration::from_millis(100));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(450)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let report = scan_site_with_fetcher(
        "https://example.com/",
        options(200, 2),
        AnalyzerTable::new(),
        Vec::new(),
        site,
        cancel,
    )
    .await
    .unwrap();

    assert!(report.cancelled);
    assert!(!report.results.is_empty());
    assert!(report.results.len() < 50);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_analyzers_run_and_exclusion_applies() {
    let site = MockSite::new(vec![
        page("https://example.com/", r#"<img src="a.png"><a href="/b">b</a>"#),
        page("https://example.com/b", r#"<html lang="en"></html>"#),
    ]);

    let dispatch = AnalyzerTable::new()
        .with(Arc::new(FnAnalyzer::new(
            "img-alt",
            "Images need alt text",
            |html: &str| {
                if html.contains("<img") && !html.contains("alt=") {
                    vec![Issue::new("img-alt", "Image missing alt text", "<img>")]
                } else {
                    Vec::new()
                }
            },
        )))
        .unwrap()
        .with(Arc::new(FnAnalyzer::new("noisy", "", |_html: &str| {
            vec![Issue::new("noisy", "always fires", "")]
        })))
        .unwrap();

    let sink = Arc::new(MemorySink::new());
    let report = scan_site_with_fetcher(
        "https://example.com/",
        ScanOptions {
            exclude_analyzers: vec!["noisy".to_string()],
            ..options(10, 2)
        },
        dispatch,
        vec![sink.clone() as Arc<dyn ResultSink>],
        site,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    let issues = report.issues_by_url();
    assert_eq!(issues["https://example.com/"].len(), 1);
    assert_eq!(issues["https://example.com/"][0].code, "img-alt");
    assert!(issues["https://example.com/b"].is_empty());
    assert_eq!(sink.len(), 2);
}

#[tokio::test]
async fn test_sqlite_sink_records_scan() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("results.db");

    let mut storage = SqliteStorage::new(&db_path).unwrap();
    let run_id = storage.create_run("test-hash").unwrap();
    let sink = Arc::new(SqliteSink::new(storage, run_id, "example.com"));

    let report = scan_site_with_fetcher(
        "https://example.com/",
        options(10, 2),
        AnalyzerTable::new(),
        vec![sink.clone() as Arc<dyn ResultSink>],
        sitemap_site(),
        CancellationToken::new(),
    )
    .await
    .unwrap();
    sink.with_storage(|s| s.complete_run(run_id)).unwrap();
    drop(sink);

    let storage = SqliteStorage::new(&db_path).unwrap();
    let stored = storage.get_run_results(run_id).unwrap();
    assert_eq!(stored.len(), report.results.len());
    assert_eq!(storage.count_total_pages(Some(run_id)).unwrap(), 4);

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.id, run_id);
    assert!(run.finished_at.is_some());
}

// ===== Real HTTP through wiremock =====

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html"),
        )
        .mount(server)
        .await;
}

async fn page_requests(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|r| r.url.path().to_string())
        .filter(|p| p != "/robots.txt" && !p.ends_with(".xml"))
        .collect()
}

#[tokio::test]
async fn test_http_crawl_with_robots_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_page(&server, "/", &links(&["/a"])).await;
    mount_page(&server, "/a", "").await;

    let start = format!("{}/", server.uri());
    let report = scan_site(
        &start,
        options(10, 2),
        AnalyzerTable::new(),
        Vec::new(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.results.len(), 2);
    assert!(report.results.values().all(|r| r.fetch_status.is_ok()));
}

#[tokio::test]
async fn test_http_crawl_with_slow_robots() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("User-agent: *\nDisallow: /\n")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/", &links(&["/a"])).await;
    mount_page(&server, "/a", "").await;

    let start = format!("{}/", server.uri());
    let report = scan_site(
        &start,
        ScanOptions {
            request_timeout: Duration::from_millis(300),
            ..options(10, 2)
        },
        AnalyzerTable::new(),
        Vec::new(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    // The unreachable robots.txt is treated as allow-all
    assert_eq!(report.results.len(), 2);
    assert!(report.results.values().all(|r| r.fetch_status.is_ok()));
}

#[tokio::test]
async fn test_http_missing_page_is_http_error() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &links(&["/missing"])).await;

    let start = format!("{}/", server.uri());
    let report = scan_site(
        &start,
        options(10, 2),
        AnalyzerTable::new(),
        Vec::new(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    let missing = format!("{}/missing", server.uri());
    assert_eq!(report.results[&missing].fetch_status, FetchStatus::HttpError(404));
}

#[tokio::test]
async fn test_http_non_html_link_is_not_analyzed() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &links(&["/report.pdf"])).await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"%PDF-1.4 <a href=\"/hidden\">x</a>".to_vec(), "application/pdf"),
        )
        .mount(&server)
        .await;

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let dispatch = AnalyzerTable::new()
        .with(Arc::new(FnAnalyzer::new("count", "", move |_html: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            Vec::new()
        })))
        .unwrap();

    let report = scan_site(
        &format!("{}/", server.uri()),
        options(10, 2),
        dispatch,
        Vec::new(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    let pdf = format!("{}/report.pdf", server.uri());
    assert_eq!(report.results[&pdf].fetch_status, FetchStatus::NotHtml);
    assert!(report.results[&pdf].discovered_links.is_empty());
    assert_eq!(report.results.len(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(page_requests(&server).await, vec!["/", "/report.pdf"]);
}

type Arrivals = Arc<Mutex<Vec<(String, Instant)>>>;

/// Serves `body` as HTML and notes when each request arrived
async fn mount_timed_page(server: &MockServer, route: &str, body: String, arrivals: &Arrivals) {
    let arrivals = Arc::clone(arrivals);
    let host = server.uri();
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(move |request: &wiremock::Request| {
            arrivals
                .lock()
                .unwrap()
                .push((format!("{}{}", host, request.url.path()), Instant::now()));
            ResponseTemplate::new(200).set_body_raw(body.clone().into_bytes(), "text/html")
        })
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_crawl_delay_spaces_fetches_per_host() {
    let delayed = MockServer::start().await;
    let undelayed = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nCrawl-delay: 1\n"))
        .mount(&delayed)
        .await;

    // Both servers live on 127.0.0.1, so they share scope but not politeness
    let arrivals: Arrivals = Arc::new(Mutex::new(Vec::new()));
    let other_home = format!("{}/", undelayed.uri());
    mount_timed_page(&delayed, "/", links(&[other_home.as_str(), "/a1", "/a2"]), &arrivals).await;
    mount_timed_page(&delayed, "/a1", String::new(), &arrivals).await;
    mount_timed_page(&delayed, "/a2", String::new(), &arrivals).await;
    mount_timed_page(&undelayed, "/", links(&["/b1", "/b2"]), &arrivals).await;
    mount_timed_page(&undelayed, "/b1", String::new(), &arrivals).await;
    mount_timed_page(&undelayed, "/b2", String::new(), &arrivals).await;

    let report = scan_site(
        &format!("{}/", delayed.uri()),
        options(20, 4),
        AnalyzerTable::new(),
        Vec::new(),
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(report.results.len(), 6);
    assert!(report.results.values().all(|r| r.fetch_status.is_ok()));

    let arrivals = arrivals.lock().unwrap().clone();
    let on = |server: &MockServer| -> Vec<Instant> {
        let prefix = server.uri();
        let mut times: Vec<Instant> = arrivals
            .iter()
            .filter(|(url, _)| url.starts_with(&prefix))
            .map(|(_, at)| *at)
            .collect();
        times.sort();
        times
    };
    let slow = on(&delayed);
    let fast = on(&undelayed);
    assert_eq!(slow.len(), 3);
    assert_eq!(fast.len(), 3);

    for pair in slow.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(950));
    }
    // The undelayed host is served by other workers while the delayed one waits
    assert!(fast[2] < slow[1]);
}
