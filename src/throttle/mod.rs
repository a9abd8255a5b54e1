//! Per-domain request pacing
//!
//! Every outbound request made by the pipeline passes through one shared
//! [`DomainThrottle`]. It is keyed by root domain, so `a.example.com` and
//! `b.example.com` draw on the same budget, and it guarantees that two request
//! starts against one root domain are at least the configured interval apart,
//! no matter how many workers are asking concurrently.
//!
//! The throttle keeps no persistent state; a restart forgets all timestamps.

use crate::config::ThrottleConfig;
use crate::url::root_domain;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Shared per-root-domain pacing
///
/// Cloning is cheap and every clone shares the same timestamp map.
#[derive(Debug, Clone)]
pub struct DomainThrottle {
    /// Start time of the most recently reserved slot per root domain
    slots: Arc<Mutex<HashMap<String, Instant>>>,

    /// Minimum time between request starts to one root domain
    min_interval: Duration,
}

impl DomainThrottle {
    /// Creates a throttle with the given minimum interval
    pub fn new(min_interval: Duration) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            min_interval,
        }
    }

    /// Creates a throttle from configuration
    pub fn from_config(config: &ThrottleConfig) -> Self {
        Self::new(Duration::from_millis(config.min_interval_ms))
    }

    /// The configured minimum interval
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until a request to `domain` may start, then returns
    ///
    /// The slot is reserved while the lock is held and the wait happens after
    /// the lock is released, so concurrent callers for the same root domain
    /// queue up one interval apart instead of racing for the same instant.
    pub async fn acquire(&self, domain: &str) {
        let key = root_domain(domain);

        let slot = {
            let mut slots = self.lock();
            let now = Instant::now();
            let slot = match slots.get(&key) {
                Some(last) => (*last + self.min_interval).max(now),
                None => now,
            };
            slots.insert(key.clone(), slot);
            slot
        };

        let now = Instant::now();
        if slot > now {
            tracing::trace!("Throttling {} for {:?}", key, slot - now);
            tokio::time::sleep_until(slot).await;
        }
    }

    /// Returns true if a request to `domain` could start right now
    pub fn allow(&self, domain: &str) -> bool {
        self.time_until_allowed(domain).is_none()
    }

    /// Records that a request to `domain` started now
    ///
    /// Used together with [`allow`](Self::allow) by callers that pace
    /// themselves instead of awaiting [`acquire`](Self::acquire).
    pub fn record_access(&self, domain: &str) {
        let key = root_domain(domain);
        let now = Instant::now();
        let mut slots = self.lock();
        let entry = slots.entry(key).or_insert(now);
        if *entry < now {
            *entry = now;
        }
    }

    /// Time left before `domain` may be requested again, if any
    pub fn time_until_allowed(&self, domain: &str) -> Option<Duration> {
        let key = root_domain(domain);
        let slots = self.lock();
        let last = slots.get(&key)?;
        let ready_at = *last + self.min_interval;
        let now = Instant::now();
        if ready_at > now {
            Some(ready_at - now)
        } else {
            None
        }
    }

    /// Number of root domains seen so far
    pub fn tracked_domains(&self) -> usize {
        self.lock().len()
    }

    // The map only holds timestamps, so a poisoned lock still guards valid data.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Mutex as AsyncMutex;

    #[tokio::test(start_paused = true)]
    async fn test_first_request_is_immediate() {
        let throttle = DomainThrottle::new(Duration::from_millis(1500));
        let start = Instant::now();
        throttle.acquire("example.com").await;
        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_request_waits_for_interval() {
        let throttle = DomainThrottle::new(Duration::from_millis(1500));
        let start = Instant::now();
        throttle.acquire("example.com").await;
        throttle.acquire("example.com").await;
        assert!(Instant::now() - start >= Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_subdomains_share_budget() {
        let throttle = DomainThrottle::new(Duration::from_secs(2));
        throttle.acquire("a.example.com").await;
        assert!(!throttle.allow("b.example.com"));
        assert!(throttle.allow("example.org"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_domains_do_not_wait() {
        let throttle = DomainThrottle::new(Duration::from_secs(5));
        let start = Instant::now();
        throttle.acquire("one.test").await;
        throttle.acquire("two.test").await;
        throttle.acquire("three.co.uk").await;
        assert_eq!(Instant::now(), start);
        assert_eq!(throttle.tracked_domains(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_are_spaced() {
        let interval = Duration::from_millis(1500);
        let throttle = DomainThrottle::new(interval);
        let starts = Arc::new(AsyncMutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..6 {
            let throttle = throttle.clone();
            let starts = starts.clone();
            let host = if i % 2 == 0 { "shared.test" } else { "www.shared.test" };
            handles.push(tokio::spawn(async move {
                throttle.acquire(host).await;
                starts.lock().await.push(Instant::now());
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut starts = starts.lock().await.clone();
        starts.sort();
        assert_eq!(starts.len(), 6);
        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= interval);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_allow_and_record_access() {
        let throttle = DomainThrottle::new(Duration::from_millis(500));
        assert!(throttle.allow("example.com"));

        throttle.record_access("example.com");
        assert!(!throttle.allow("example.com"));
        assert!(throttle.time_until_allowed("example.com").is_some());

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(throttle.allow("example.com"));
    }
}
