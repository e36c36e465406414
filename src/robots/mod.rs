//! Politeness policy module
//!
//! This module fetches, parses and caches robots.txt rules and discovers
//! sitemap URLs. Parsing is pure; the async functions here are the thin I/O
//! layer around it and never return errors: a missing or broken robots.txt
//! means "allow everything", a missing sitemap means "no extra seeds".

mod cache;
mod parser;
mod sitemap;

pub use cache::{CachedPolicy, PolicyCache};
pub use parser::{parse_robots, PolicyRule};
pub use sitemap::{parse_sitemap, SitemapDocument};

use crate::crawler::FetchGate;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Upper bound on child sitemaps followed from one sitemap index
pub const MAX_CHILD_SITEMAPS: usize = 50;

/// Fetches and parses robots.txt for the host of `url`
///
/// Fetch failures, timeouts and non-2xx responses all produce
/// [`PolicyRule::allow_all`] with `default_delay`.
pub async fn load_policy(
    gate: &FetchGate,
    url: &Url,
    user_agent: &str,
    default_delay: Duration,
) -> PolicyRule {
    let robots_url = match url.join("/robots.txt") {
        Ok(u) => u,
        Err(_) => return PolicyRule::allow_all(default_delay),
    };

    match gate.fetch(&robots_url).await {
        Ok(body) => {
            tracing::debug!("Fetched {}", robots_url);
            parse_robots(&body, user_agent, default_delay)
        }
        Err(e) => {
            tracing::debug!("No usable robots.txt at {} ({}), allowing all", robots_url, e);
            PolicyRule::allow_all(default_delay)
        }
    }
}

/// Checks a URL against a rule using its path and query
pub fn is_allowed(rule: &PolicyRule, url: &Url) -> bool {
    match url.query() {
        Some(q) => rule.is_allowed(&format!("{}?{}", url.path(), q)),
        None => rule.is_allowed(url.path()),
    }
}

/// Collects page URLs from `/sitemap.xml` and any robots.txt `Sitemap:` entries
///
/// Sitemap indexes are followed one level deep. URLs are returned as
/// written in the sitemap; the caller normalizes and scope-filters them.
pub async fn discover_sitemap_urls(gate: &FetchGate, start: &Url, announced: &[String]) -> Vec<String> {
    let mut candidates: Vec<Url> = Vec::new();
    if let Ok(default) = start.join("/sitemap.xml") {
        candidates.push(default);
    }
    candidates.extend(announced.iter().filter_map(|s| Url::parse(s).ok()));

    let mut fetched: HashSet<String> = HashSet::new();
    let mut pages = Vec::new();

    for sitemap_url in candidates {
        if !fetched.insert(sitemap_url.to_string()) {
            continue;
        }
        let Some(doc) = fetch_sitemap(gate, &sitemap_url).await else {
            continue;
        };
        pages.extend(doc.pages);

        for child in doc.sitemaps.iter().take(MAX_CHILD_SITEMAPS) {
            let Ok(child_url) = Url::parse(child) else {
                continue;
            };
            if !fetched.insert(child_url.to_string()) {
                continue;
            }
            if let Some(child_doc) = fetch_sitemap(gate, &child_url).await {
                pages.extend(child_doc.pages);
            }
        }
    }

    tracing::debug!("Sitemaps for {} listed {} URLs", start, pages.len());
    pages
}

async fn fetch_sitemap(gate: &FetchGate, url: &Url) -> Option<SitemapDocument> {
    match gate.fetch(url).await {
        Ok(body) => Some(parse_sitemap(&body)),
        Err(e) => {
            tracing::debug!("Sitemap {} unavailable: {}", url, e);
            None
        }
    }
}
