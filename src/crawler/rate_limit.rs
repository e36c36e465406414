use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Spaces requests evenly at a fixed rate across all workers
///
/// Each caller reserves the next free slot under a short lock and then
/// sleeps outside it until the slot arrives.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RateLimiter {
    /// Creates a limiter allowing `per_second` requests per second
    ///
    /// Returns `None` for zero, negative or non-finite rates, meaning
    /// "unlimited".
    pub fn new(per_second: f64) -> Option<Self> {
        if !per_second.is_finite() || per_second <= 0.0 {
            return None;
        }
        let interval = Duration::try_from_secs_f64(1.0 / per_second).ok()?;
        Some(Self {
            interval,
            next_slot: Mutex::new(Instant::now()),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until this caller's slot is due
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let slot = (*next).max(now);
            *next = slot + self.interval;
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

/// Per-host fetch slots
///
/// Keeps fetches to one host at least its crawl delay apart no matter which
/// worker issues them. Hosts never wait on each other.
#[derive(Debug, Default)]
pub struct HostSlots {
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl HostSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next slot for `host` and waits until it is due
    pub async fn acquire(&self, host: &str, delay: Duration) {
        if delay.is_zero() {
            return;
        }
        let slot = {
            let mut slots = self.next_slot.lock().unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let next = slots.entry(host.to_string()).or_insert(now);
            let slot = (*next).max(now);
            *next = slot + delay;
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_positive_rate_is_unlimited() {
        assert!(RateLimiter::new(0.0).is_none());
        assert!(RateLimiter::new(-1.0).is_none());
        assert!(RateLimiter::new(f64::NAN).is_none());
    }

    #[test]
    fn test_interval_from_rate() {
        let limiter = RateLimiter::new(4.0).unwrap();
        assert_eq!(limiter.interval(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_requests_are_spaced() {
        let limiter = RateLimiter::new(50.0).unwrap();
        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire().await;
        }
        // First slot is immediate, the next four are 20ms apart
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_host_slots_space_one_host() {
        let slots = HostSlots::new();
        let delay = Duration::from_millis(100);
        let start = Instant::now();
        slots.acquire("a.test", delay).await;
        slots.acquire("a.test", delay).await;
        slots.acquire("a.test", delay).await;
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_host_slots_are_independent() {
        let slots = HostSlots::new();
        let delay = Duration::from_secs(5);
        let start = Instant::now();
        slots.acquire("a.test", delay).await;
        slots.acquire("b.test", delay).await;
        slots.acquire("c.test:8080", delay).await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_host_slots_zero_delay_never_waits() {
        let slots = HostSlots::new();
        let start = Instant::now();
        for _ in 0..10 {
            slots.acquire("a.test", Duration::ZERO).await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
