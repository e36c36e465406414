//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the worker pool that drives a crawl:
//! - Seeding the frontier from the start URL and sitemaps
//! - Running `concurrency` workers against the shared frontier
//! - Enforcing the page budget and per-host crawl delays
//! - Aggregating results and fanning them out to sinks
//! - Handling cancellation and shutdown

use crate::analyzer::AnalyzerTable;
use crate::crawler::budget::CrawlBudget;
use crate::crawler::frontier::Frontier;
use crate::crawler::pipeline::process_page;
use crate::crawler::rate_limit::{HostSlots, RateLimiter};
use crate::crawler::{
    CrawlPhase, CrawlReport, CrawlSource, CrawlTarget, FetchError, FetchGate, FetchStatus, Fetcher,
    PageResult, ScanOptions,
};
use crate::robots::{discover_sitemap_urls, is_allowed, PolicyCache};
use crate::sink::ResultSink;
use crate::url::{host_key, normalize_url, CrawlScope};
use crate::SiteableError;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// State shared by the coordinator and all of its workers
struct Shared {
    start: Url,
    scope: CrawlScope,
    options: ScanOptions,
    exclude: HashSet<String>,
    dispatch: AnalyzerTable,
    sinks: Vec<Arc<dyn ResultSink>>,
    gate: FetchGate,
    policies: PolicyCache,
    frontier: Frontier,
    budget: CrawlBudget,
    rate_limiter: Option<RateLimiter>,
    host_slots: HostSlots,
    results: Mutex<HashMap<String, PageResult>>,
    duplicates: AtomicUsize,
    phase: Mutex<CrawlPhase>,
    cancel: CancellationToken,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    shared: Arc<Shared>,
}

impl Coordinator {
    /// Creates a coordinator for one crawl
    ///
    /// # Errors
    ///
    /// Fails only if `start_url` is not an absolute HTTP(S) URL.
    pub fn new(
        start_url: &str,
        options: ScanOptions,
        dispatch: AnalyzerTable,
        sinks: Vec<Arc<dyn ResultSink>>,
        fetcher: Arc<dyn Fetcher>,
        cancel: CancellationToken,
    ) -> Result<Self, SiteableError> {
        let start = normalize_url(start_url)?;
        let scope = CrawlScope::from_start_url(&start)?;

        let gate = FetchGate::new(fetcher, options.effective_max_connections(), options.request_timeout);
        let policies = PolicyCache::new(
            options.user_agent.clone(),
            options.default_crawl_delay,
            options.respect_robots,
        );
        let exclude = options.exclude_analyzers.iter().cloned().collect();

        Ok(Self {
            shared: Arc::new(Shared {
                start,
                scope,
                budget: CrawlBudget::new(options.max_pages),
                rate_limiter: RateLimiter::new(options.rate_limit),
                host_slots: HostSlots::new(),
                exclude,
                options,
                dispatch,
                sinks,
                gate,
                policies,
                frontier: Frontier::new(),
                results: Mutex::new(HashMap::new()),
                duplicates: AtomicUsize::new(0),
                phase: Mutex::new(CrawlPhase::Idle),
                cancel,
            }),
        })
    }

    pub fn phase(&self) -> CrawlPhase {
        *self.shared.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs the crawl to completion, budget exhaustion, or cancellation
    pub async fn run(self) -> Result<CrawlReport, SiteableError> {
        let shared = self.shared;
        let started = Instant::now();
        tracing::info!(
            "Scanning {} (scope {}, max {} pages, {} workers)",
            shared.start,
            shared.scope.domain(),
            shared.options.max_pages,
            shared.options.concurrency
        );

        shared.set_phase(CrawlPhase::Seeding);
        tokio::select! {
            _ = shared.cancel.cancelled() => {}
            _ = shared.seed() => {}
        }

        shared.set_phase(CrawlPhase::Running);
        let mut workers = JoinSet::new();
        for id in 0..shared.options.concurrency.max(1) {
            let shared = Arc::clone(&shared);
            workers.spawn(async move { shared.worker(id).await });
        }

        // Workers return once the frontier drains, closes, or the crawl is cancelled
        let mut first = true;
        while let Some(joined) = workers.join_next().await {
            if first {
                shared.set_phase(CrawlPhase::Draining);
                first = false;
            }
            if let Err(e) = joined {
                tracing::error!("Crawl worker failed: {}", e);
            }
        }
        if first {
            shared.set_phase(CrawlPhase::Draining);
        }

        let dropped = shared.frontier.drain_pending();
        for target in &dropped {
            tracing::debug!("Dropped {} ({:?}, never dispatched)", target.url, target.source);
        }
        if !dropped.is_empty() {
            tracing::info!("{} queued URLs were not dispatched", dropped.len());
        }

        let duplicates = shared.duplicates.load(Ordering::Acquire);
        if duplicates > 0 {
            return Err(SiteableError::Invariant(format!(
                "{} URLs produced more than one result",
                duplicates
            )));
        }

        let results = std::mem::take(&mut *shared.lock_results());
        let report = CrawlReport {
            start_url: shared.start.to_string(),
            pages_fetched: shared.budget.started(),
            cancelled: shared.cancel.is_cancelled(),
            elapsed: started.elapsed(),
            results,
        };
        shared.set_phase(CrawlPhase::Done);

        tracing::info!(
            "Scan {}: {} results, {} pages fetched, {} issues in {:?}",
            if report.cancelled { "cancelled" } else { "finished" },
            report.results.len(),
            report.pages_fetched,
            report.total_issues(),
            report.elapsed
        );
        Ok(report)
    }
}

impl Shared {
    fn set_phase(&self, next: CrawlPhase) {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::info!("Crawl phase: {} -> {}", *phase, next);
        *phase = next;
    }

    fn lock_results(&self) -> MutexGuard<'_, HashMap<String, PageResult>> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads the start host's policy and queues the start URL plus sitemap URLs
    async fn seed(&self) {
        let rule = self.policies.rule_for(&self.gate, &self.start).await;
        self.frontier
            .offer(CrawlTarget::new(self.start.clone(), CrawlSource::Seed, 0));

        if !self.options.use_sitemap {
            return;
        }

        let listed = discover_sitemap_urls(&self.gate, &self.start, &rule.sitemap_urls).await;
        let mut queued = 0;
        for raw in listed {
            match CrawlTarget::parse(&raw, CrawlSource::Sitemap, 0) {
                Ok(target) if self.scope.contains(&target.url) => {
                    if self.frontier.offer(target) {
                        queued += 1;
                    }
                }
                Ok(target) => tracing::debug!("Dropped off-scope sitemap URL {}", target.url),
                Err(e) => tracing::debug!("Dropped sitemap entry {}: {}", raw, e),
            }
        }
        tracing::info!("Seeded frontier with start URL and {} sitemap URLs", queued);
    }

    async fn worker(&self, id: usize) {
        tracing::trace!("Worker {} started", id);

        while let Some(target) = self.frontier.take(&self.cancel).await {
            let url = target.url.clone();

            let rule = tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.frontier.complete();
                    break;
                }
                rule = self.policies.rule_for(&self.gate, &url) => rule,
            };

            if !is_allowed(&rule, &url) {
                tracing::debug!("Blocked by robots.txt: {}", url);
                self.record(PageResult::failed(url.as_str(), FetchStatus::RobotsBlocked));
                self.frontier.complete();
                continue;
            }

            if !self.budget.try_start() {
                tracing::debug!("Page budget exhausted, discarding {}", url);
                self.frontier.complete();
                self.frontier.close();
                break;
            }

            let delay = rule.delay_for().max(self.options.delay);
            let fetched = tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Abandoned in-flight fetch of {}", url);
                    self.frontier.complete();
                    break;
                }
                fetched = self.fetch(&url, delay) => fetched,
            };

            let result = match fetched {
                Ok(body) => self.analyze(&target, &body),
                Err(e) => {
                    tracing::debug!("Fetch failed for {}: {}", url, e);
                    PageResult::failed(url.as_str(), status_for(&e))
                }
            };
            self.record(result);
            self.frontier.complete();

            if !delay.is_zero() && !self.frontier.is_closed() && !self.frontier.is_drained() {
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        tracing::trace!("Worker {} finished", id);
    }

    async fn fetch(&self, url: &Url, delay: Duration) -> Result<String, FetchError> {
        if let Some(host) = host_key(url) {
            self.host_slots.acquire(&host, delay).await;
        }
        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await;
        }
        tracing::debug!("Fetching {}", url);
        self.gate.fetch_page(url).await
    }

    /// Runs the page pipeline and queues in-scope links one level deeper
    fn analyze(&self, target: &CrawlTarget, body: &str) -> PageResult {
        let outcome = process_page(body, &target.url, &self.scope, &self.dispatch, &self.exclude);

        let depth = target.depth + 1;
        let follow = self.options.max_depth.map_or(true, |max| depth <= max);
        if follow {
            for link in outcome.in_scope_links() {
                self.frontier
                    .offer(CrawlTarget::new(link.clone(), CrawlSource::Discovered, depth));
            }
        }

        PageResult {
            url: target.url.to_string(),
            issues: outcome.issues,
            fetch_status: FetchStatus::Ok,
            discovered_links: outcome.links.into_iter().map(|l| l.url.to_string()).collect(),
        }
    }

    /// Stores a terminal result and hands it to every sink
    fn record(&self, result: PageResult) {
        for sink in &self.sinks {
            if let Err(e) = sink.emit(&result.url, &result) {
                tracing::warn!("Result sink failed for {}: {}", result.url, e);
            }
        }

        let url = result.url.clone();
        let done = {
            let mut results = self.lock_results();
            if results.insert(url.clone(), result).is_some() {
                self.duplicates.fetch_add(1, Ordering::AcqRel);
                tracing::error!("Duplicate result for {}", url);
            }
            results.len()
        };

        if let Some(progress) = &self.options.progress {
            progress(done, self.frontier.seen_count(), &url);
        }
    }
}

fn status_for(error: &FetchError) -> FetchStatus {
    match error {
        FetchError::Http(code) => FetchStatus::HttpError(*code),
        FetchError::Timeout => FetchStatus::Timeout,
        FetchError::Network(_) => FetchStatus::NetworkError,
        FetchError::NotHtml(_) => FetchStatus::NotHtml,
    }
}
