//! Page pipeline: analysis and link extraction for one fetched document
//!
//! Runs synchronously. `scraper::Html` is not `Send`, so the parsed document
//! never lives across an await point in a worker.

use crate::analyzer::{AnalyzerTable, Issue};
use crate::url::{resolve_url, CrawlScope};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// A link found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    /// Absolute, normalized target
    pub url: Url,

    /// Whether the crawl may follow it
    pub in_scope: bool,
}

/// What the pipeline learned about a page
#[derive(Debug, Clone, Default)]
pub struct PageOutcome {
    pub issues: Vec<Issue>,
    pub links: Vec<DiscoveredLink>,
}

impl PageOutcome {
    /// Links the crawl may enqueue
    pub fn in_scope_links(&self) -> impl Iterator<Item = &Url> {
        self.links.iter().filter(|l| l.in_scope).map(|l| &l.url)
    }
}

/// Analyzes `html` and extracts its links
///
/// # Example
///
/// ```
/// use siteable::analyzer::AnalyzerTable;
/// use siteable::crawler::process_page;
/// use siteable::url::CrawlScope;
/// use std::collections::HashSet;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/").unwrap();
/// let scope = CrawlScope::from_start_url(&base).unwrap();
/// let html = r#"<a href="/about">About</a><a href="https://other.org/">Out</a>"#;
/// let outcome = process_page(html, &base, &scope, &AnalyzerTable::new(), &HashSet::new());
/// assert_eq!(outcome.links.len(), 2);
/// assert_eq!(outcome.in_scope_links().count(), 1);
/// ```
pub fn process_page(
    html: &str,
    base_url: &Url,
    scope: &CrawlScope,
    dispatch: &AnalyzerTable,
    exclude: &HashSet<String>,
) -> PageOutcome {
    let issues = dispatch.analyze(html, exclude);
    let links = extract_links(html, base_url)
        .into_iter()
        .map(|url| DiscoveredLink {
            in_scope: scope.contains(&url),
            url,
        })
        .collect();

    PageOutcome { issues, links }
}

/// Extracts followable `<a href>` targets from a document
///
/// # Link Extraction Rules
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same page anchors)
/// - Anything that does not resolve to HTTP(S)
///
/// Results are normalized and deduplicated, in document order.
pub fn extract_links(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            let Some(url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            else {
                continue;
            };

            if seen.insert(url.as_str().to_string()) {
                links.push(url);
            }
        }
    }

    links
}

fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    resolve_url(base_url, href)
}
