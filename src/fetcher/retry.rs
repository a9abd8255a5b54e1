//! Retry policy and the attempt state machine
//!
//! A fetch moves through `Attempting → Retrying → Attempting → ...` until it
//! succeeds, is `Rejected` by a permanent failure, or is `Exhausted` by the
//! retry limit or the opportunity's retry budget. The transition function is
//! pure so the permanent/transient branch can be tested without a network.

use crate::config::FetcherConfig;
use rand::Rng;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Whether a failure is worth retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Timeout, 429, 5xx, dropped connection
    Transient,
    /// DNS failure, connection refused, TLS failure, redirect loop
    Permanent,
}

/// State of one logical fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// About to send attempt number `n` (0-based)
    Attempting(u32),
    /// Waiting out the backoff for retry number `n` (0-based)
    Retrying(u32),
    /// Gave up on transient failures
    Exhausted,
    /// Gave up immediately on a permanent failure
    Rejected,
}

impl RetryState {
    /// Returns true if no further attempt will be made
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exhausted | Self::Rejected)
    }
}

/// Retries remaining for one opportunity across all of its fetches
///
/// Clones share the same counter.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    remaining: Arc<AtomicU32>,
    initial: u32,
}

impl RetryBudget {
    pub fn new(retries: u32) -> Self {
        Self {
            remaining: Arc::new(AtomicU32::new(retries)),
            initial: retries,
        }
    }

    /// A budget that never runs out; per-fetch limits still apply
    pub fn unlimited() -> Self {
        Self::new(u32::MAX)
    }

    /// Takes one retry from the budget; false if none are left
    pub fn try_consume(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    pub fn remaining(&self) -> u32 {
        self.remaining.load(Ordering::Acquire)
    }

    /// Retries consumed so far
    pub fn spent(&self) -> u32 {
        self.initial.saturating_sub(self.remaining())
    }
}

/// Exponential backoff with jitter
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Relative jitter in [0, 1)
    pub jitter: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &FetcherConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter,
        }
    }

    /// `min(max_delay, base_delay * 2^retry)` before jitter
    pub fn nominal_delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.min(31));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Smallest and largest delay `backoff(retry)` can return
    pub fn delay_bounds(&self, retry: u32) -> (Duration, Duration) {
        let nominal = self.nominal_delay(retry);
        let low = nominal.mul_f64(1.0 - self.jitter);
        let high = nominal.mul_f64(1.0 + self.jitter).min(self.max_delay);
        (low, high)
    }

    /// Jittered delay for the given retry, never above `max_delay`
    pub fn backoff(&self, retry: u32) -> Duration {
        self.backoff_with(retry, &mut rand::thread_rng())
    }

    pub fn backoff_with<R: Rng + ?Sized>(&self, retry: u32, rng: &mut R) -> Duration {
        let nominal = self.nominal_delay(retry);
        if self.jitter <= 0.0 {
            return nominal;
        }
        let spread = rng.gen_range(-self.jitter..=self.jitter);
        nominal.mul_f64(1.0 + spread).min(self.max_delay)
    }

    /// Next state after attempt `attempt` failed with `class`
    pub fn advance(&self, attempt: u32, class: FailureClass, budget: &RetryBudget) -> RetryState {
        match class {
            FailureClass::Permanent => RetryState::Rejected,
            FailureClass::Transient if attempt >= self.max_retries => RetryState::Exhausted,
            FailureClass::Transient if !budget.try_consume() => RetryState::Exhausted,
            FailureClass::Transient => RetryState::Retrying(attempt),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FetcherConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(8000),
            jitter: 0.25,
        }
    }

    #[test]
    fn test_nominal_delay_doubles_and_caps() {
        let p = policy();
        assert_eq!(p.nominal_delay(0), Duration::from_millis(500));
        assert_eq!(p.nominal_delay(1), Duration::from_millis(1000));
        assert_eq!(p.nominal_delay(3), Duration::from_millis(4000));
        assert_eq!(p.nominal_delay(4), Duration::from_millis(8000));
        assert_eq!(p.nominal_delay(40), Duration::from_millis(8000));
    }

    #[test]
    fn test_backoff_is_monotonic_and_capped() {
        let p = policy();
        let mut rng = StdRng::seed_from_u64(7);
        for r in 0..12 {
            assert!(p.nominal_delay(r) <= p.nominal_delay(r + 1));
            let (low, high) = p.delay_bounds(r);
            assert!(high <= p.max_delay);
            for _ in 0..50 {
                let d = p.backoff_with(r, &mut rng);
                assert!(d >= low && d <= high, "retry {} gave {:?}", r, d);
            }
        }
    }

    #[test]
    fn test_no_jitter_is_exact() {
        let p = RetryPolicy {
            jitter: 0.0,
            ..policy()
        };
        assert_eq!(p.backoff(2), Duration::from_millis(2000));
    }

    #[test]
    fn test_permanent_failure_rejects_immediately() {
        let p = policy();
        let budget = RetryBudget::new(10);
        assert_eq!(
            p.advance(0, FailureClass::Permanent, &budget),
            RetryState::Rejected
        );
        assert_eq!(budget.remaining(), 10);
    }

    #[test]
    fn test_transient_failure_retries_until_limit() {
        let p = policy();
        let budget = RetryBudget::unlimited();
        assert_eq!(
            p.advance(0, FailureClass::Transient, &budget),
            RetryState::Retrying(0)
        );
        assert_eq!(
            p.advance(2, FailureClass::Transient, &budget),
            RetryState::Retrying(2)
        );
        assert_eq!(
            p.advance(3, FailureClass::Transient, &budget),
            RetryState::Exhausted
        );
    }

    #[test]
    fn test_budget_exhaustion_stops_retries() {
        let p = policy();
        let budget = RetryBudget::new(1);
        assert_eq!(
            p.advance(0, FailureClass::Transient, &budget),
            RetryState::Retrying(0)
        );
        assert_eq!(
            p.advance(1, FailureClass::Transient, &budget),
            RetryState::Exhausted
        );
        assert_eq!(budget.spent(), 1);
    }

    #[test]
    fn test_budget_shared_between_clones() {
        let budget = RetryBudget::new(2);
        let other = budget.clone();
        assert!(budget.try_consume());
        assert!(other.try_consume());
        assert!(!budget.try_consume());
        assert_eq!(other.remaining(), 0);
    }

    #[test]
    fn test_terminal_states() {
        assert!(RetryState::Exhausted.is_terminal());
        assert!(RetryState::Rejected.is_terminal());
        assert!(!RetryState::Attempting(0).is_terminal());
        assert!(!RetryState::Retrying(1).is_terminal());
    }
}
