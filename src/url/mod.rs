//! URL handling module for SiteAble
//!
//! This module provides URL normalization, domain extraction, registrable
//! domain computation and crawl scope checks.

mod domain;
mod matcher;
mod normalize;

pub use domain::{extract_domain, host_key, registrable_domain};
pub use matcher::is_within_domain;
pub use normalize::{normalize_url, resolve_url};

use crate::UrlError;
use url::Url;

/// The set of hosts a crawl is allowed to dispatch fetches to
///
/// A scope is anchored on the registrable domain of the start URL: the
/// domain itself and all of its subdomains are in scope, everything else is
/// external.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlScope {
    domain: String,
}

impl CrawlScope {
    /// Builds the scope for a crawl starting at `start`
    pub fn from_start_url(start: &Url) -> Result<Self, UrlError> {
        let host = extract_domain(start).ok_or(UrlError::MissingDomain)?;
        Ok(Self {
            domain: registrable_domain(&host),
        })
    }

    /// The registrable domain this scope is anchored on
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns true if `url` may be enqueued for fetching
    pub fn contains(&self, url: &Url) -> bool {
        extract_domain(url)
            .map(|host| is_within_domain(&self.domain, &host))
            .unwrap_or(false)
    }
}
