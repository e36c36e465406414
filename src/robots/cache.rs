//! Per-host politeness rule cache
//!
//! Rules are loaded lazily on the first URL seen for each host and then
//! shared read-only for the rest of the crawl. The lock is never held across
//! the robots.txt fetch, so two workers may both load the same host; the
//! first stored rule wins and the duplicate is dropped.

use crate::crawler::FetchGate;
use crate::robots::{load_policy, PolicyRule};
use crate::url::host_key;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use url::Url;

/// A loaded rule together with when it was fetched
#[derive(Debug, Clone)]
pub struct CachedPolicy {
    pub rule: Arc<PolicyRule>,
    pub fetched_at: DateTime<Utc>,
}

impl CachedPolicy {
    pub fn new(rule: PolicyRule) -> Self {
        Self {
            rule: Arc::new(rule),
            fetched_at: Utc::now(),
        }
    }

    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.fetched_at
    }
}

/// Host → [`PolicyRule`] map shared by all workers of a crawl
#[derive(Debug)]
pub struct PolicyCache {
    entries: RwLock<HashMap<String, CachedPolicy>>,
    user_agent: String,
    default_delay: Duration,
    respect_robots: bool,
}

impl PolicyCache {
    /// Creates an empty cache
    ///
    /// With `respect_robots` off no robots.txt is ever fetched and every
    /// host gets an allow-all rule carrying `default_delay`.
    pub fn new(user_agent: impl Into<String>, default_delay: Duration, respect_robots: bool) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            user_agent: user_agent.into(),
            default_delay,
            respect_robots,
        }
    }

    /// Returns the cached rule for `url`'s host without loading
    pub fn get(&self, url: &Url) -> Option<Arc<PolicyRule>> {
        let key = host_key(url)?;
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(&key).map(|c| Arc::clone(&c.rule))
    }

    /// Returns the rule for `url`'s host, loading robots.txt on first use
    ///
    /// Never fails: any problem fetching robots.txt yields a permissive rule.
    pub async fn rule_for(&self, gate: &FetchGate, url: &Url) -> Arc<PolicyRule> {
        if let Some(rule) = self.get(url) {
            return rule;
        }

        let Some(key) = host_key(url) else {
            return Arc::new(PolicyRule::allow_all(self.default_delay));
        };

        let rule = if self.respect_robots {
            load_policy(gate, url, &self.user_agent, self.default_delay).await
        } else {
            PolicyRule::allow_all(self.default_delay)
        };

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let cached = entries.entry(key.clone()).or_insert_with(|| {
            tracing::debug!(
                "Cached politeness rule for {}: {} disallow, {} allow, delay {:?}",
                key,
                rule.disallow.len(),
                rule.allow.len(),
                rule.crawl_delay
            );
            CachedPolicy::new(rule)
        });
        tracing::trace!("Policy for {} is {}ms old", key, cached.age().num_milliseconds());
        Arc::clone(&cached.rule)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
