use std::sync::atomic::{AtomicUsize, Ordering};

/// Global cap on page fetches initiated during one crawl
///
/// [`try_start`](Self::try_start) is a single atomic check-and-increment, so
/// the started count can never pass `max_pages` even with many workers
/// racing for the last slot.
#[derive(Debug)]
pub struct CrawlBudget {
    max_pages: usize,
    started: AtomicUsize,
}

impl CrawlBudget {
    pub fn new(max_pages: usize) -> Self {
        Self {
            max_pages,
            started: AtomicUsize::new(0),
        }
    }

    /// Claims one fetch slot; `false` once the budget is spent
    pub fn try_start(&self) -> bool {
        self.started
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max_pages).then_some(n + 1)
            })
            .is_ok()
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::Acquire)
    }

    pub fn remaining(&self) -> usize {
        self.max_pages.saturating_sub(self.started())
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }
}
