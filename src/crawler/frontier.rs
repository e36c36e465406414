//! Crawl frontier: a deduplicating FIFO work queue
//!
//! The frontier owns the visited set. A URL is inserted into the visited set
//! in the same critical section that checks it, so no URL is ever queued
//! twice no matter how many workers offer it at once.
//!
//! It also counts in-flight targets (taken but not yet completed). A worker
//! that finds the queue empty waits while anything is in flight, because an
//! in-flight page may still discover new links. The crawl is over when the
//! queue is empty and nothing is in flight.

use crate::crawler::CrawlTarget;
use crate::url::normalize_url;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct FrontierState {
    seen: HashSet<String>,
    pending: VecDeque<CrawlTarget>,
    in_flight: usize,
    closed: bool,
}

enum Poll {
    Ready(CrawlTarget),
    Wait,
    Finished,
}

/// Shared work queue for all crawl workers
#[derive(Debug, Default)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    notify: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a target unless its URL has been seen before
    ///
    /// Returns `false` for duplicates, unnormalizable URLs, and anything
    /// offered after [`close`](Self::close).
    pub fn offer(&self, mut target: CrawlTarget) -> bool {
        match normalize_url(target.url.as_str()) {
            Ok(url) => target.url = url,
            Err(e) => {
                tracing::trace!("Rejected {}: {}", target.url, e);
                return false;
            }
        }

        {
            let mut state = self.lock();
            if state.closed {
                tracing::trace!("Frontier closed, dropping {}", target.url);
                return false;
            }
            if !state.seen.insert(target.url.as_str().to_string()) {
                return false;
            }
            tracing::trace!("Queued {} (depth {})", target.url, target.depth);
            state.pending.push_back(target);
        }

        self.notify.notify_one();
        true
    }

    fn poll(&self) -> Poll {
        let mut state = self.lock();
        if state.closed {
            return Poll::Finished;
        }
        if let Some(target) = state.pending.pop_front() {
            state.in_flight += 1;
            return Poll::Ready(target);
        }
        if state.in_flight == 0 {
            Poll::Finished
        } else {
            Poll::Wait
        }
    }

    /// Takes the next target, waiting while other targets are in flight
    ///
    /// Returns `None` once the frontier is drained or closed, or when
    /// `cancel` fires. Every `Some` must be paired with a call to
    /// [`complete`](Self::complete).
    pub async fn take(&self, cancel: &CancellationToken) -> Option<CrawlTarget> {
        loop {
            if cancel.is_cancelled() {
                return None;
            }

            // Register interest before looking at the state so a wakeup
            // between the check and the await is not lost
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.poll() {
                Poll::Ready(target) => return Some(target),
                Poll::Finished => return None,
                Poll::Wait => {}
            }

            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = &mut notified => {}
            }
        }
    }

    /// Non-waiting variant of [`take`](Self::take)
    pub fn try_take(&self) -> Option<CrawlTarget> {
        match self.poll() {
            Poll::Ready(target) => Some(target),
            Poll::Wait | Poll::Finished => None,
        }
    }

    /// Marks one taken target as finished
    pub fn complete(&self) {
        let drained = {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.pending.is_empty() && state.in_flight == 0
        };
        if drained {
            self.notify.notify_waiters();
        }
    }

    /// Stops accepting offers and wakes every waiting worker
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }

    /// True when nothing is queued and nothing is in flight
    pub fn is_drained(&self) -> bool {
        let state = self.lock();
        state.pending.is_empty() && state.in_flight == 0
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of queued, not yet taken targets
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Number of distinct URLs ever accepted
    pub fn seen_count(&self) -> usize {
        self.lock().seen.len()
    }

    /// Removes and returns all targets that were never taken
    pub fn drain_pending(&self) -> Vec<CrawlTarget> {
        self.lock().pending.drain(..).collect()
    }
}
