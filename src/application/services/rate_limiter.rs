//! Per-client token-bucket admission control.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A single client's bucket. Refill is computed lazily on each check.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn full(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
        }
    }

    fn refill(&mut self, capacity: f64, refill_rate: f64, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_refill = now;
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Allowed,
    /// Denied; one full token is available after `retry_after`.
    Denied { retry_after: Duration },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Token-bucket rate limiter keyed by client identifier.
///
/// Buckets are created full on first sight and are never evicted, so the map
/// grows with the number of distinct keys seen. Each bucket has its own lock.
pub struct RateLimiter {
    buckets: DashMap<String, Arc<Mutex<TokenBucket>>>,
    capacity: f64,
    refill_rate: f64,
}

impl RateLimiter {
    /// Creates a limiter admitting bursts of `capacity` and refilling
    /// `refill_rate` tokens per second.
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        Self {
            buckets: DashMap::new(),
            capacity: f64::from(capacity),
            refill_rate,
        }
    }

    /// Returns true if `key` may proceed now.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        self.check_at(key, now).is_allowed()
    }

    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now())
    }

    /// Refills `key`'s bucket up to `now` and takes one token if available.
    ///
    /// A denial leaves the fractional balance in place.
    pub fn check_at(&self, key: &str, now: Instant) -> Decision {
        let bucket = self.bucket(key, now);
        let mut bucket = bucket.lock();

        bucket.refill(self.capacity, self.refill_rate, now);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return Decision::Allowed;
        }

        let missing = 1.0 - bucket.tokens;
        // A rate of zero, or one too slow to fit a Duration, never refills.
        let retry_after = Duration::try_from_secs_f64(missing / self.refill_rate)
            .unwrap_or(Duration::MAX);
        Decision::Denied { retry_after }
    }

    /// Number of distinct keys with a bucket.
    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }

    fn bucket(&self, key: &str, now: Instant) -> Arc<Mutex<TokenBucket>> {
        if let Some(existing) = self.buckets.get(key) {
            return existing.clone();
        }

        self.buckets
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(TokenBucket::full(self.capacity, now))))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_deny_then_recover() {
        let limiter = RateLimiter::new(5, 1.0);
        let start = Instant::now();

        for _ in 0..5 {
            assert!(limiter.allow_at("client", start));
        }
        assert!(!limiter.allow_at("client", start));
        assert!(limiter.allow_at("client", start + Duration::from_secs(1)));
    }

    #[test]
    fn test_capacity_caps_after_long_idle() {
        let limiter = RateLimiter::new(3, 10.0);
        let start = Instant::now();
        assert!(limiter.allow_at("client", start));

        let later = start + Duration::from_secs(3600);
        for _ in 0..3 {
            assert!(limiter.allow_at("client", later));
        }
        assert!(!limiter.allow_at("client", later));
    }

    #[test]
    fn test_denial_does_not_enable_immediate_success() {
        let limiter = RateLimiter::new(1, 1.0);
        let start = Instant::now();

        assert!(limiter.allow_at("client", start));
        assert!(!limiter.allow_at("client", start));
        assert!(!limiter.allow_at("client", start));
    }

    #[test]
    fn test_partial_refill_is_kept_across_denials() {
        let limiter = RateLimiter::new(1, 2.0);
        let start = Instant::now();
        assert!(limiter.allow_at("client", start));

        // Half a token accrued, not enough.
        assert!(!limiter.allow_at("client", start + Duration::from_millis(250)));
        // The other half accrues; the earlier half was not discarded.
        assert!(limiter.allow_at("client", start + Duration::from_millis(500)));
    }

    #[test]
    fn test_retry_after_reports_time_to_next_token() {
        let limiter = RateLimiter::new(1, 4.0);
        let start = Instant::now();
        limiter.check_at("client", start);

        match limiter.check_at("client", start) {
            Decision::Denied { retry_after } => {
                assert_eq!(retry_after, Duration::from_millis(250));
            }
            Decision::Allowed => panic!("expected denial"),
        }
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(1, 1.0);
        let now = Instant::now();

        assert!(limiter.allow_at("a", now));
        assert!(!limiter.allow_at("a", now));
        assert!(limiter.allow_at("b", now));
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_concurrent_checks_admit_exactly_capacity() {
        let limiter = Arc::new(RateLimiter::new(100, 0.0));
        let now = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    (0..50).filter(|_| limiter.allow_at("shared", now)).count()
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 100);
    }

    #[test]
    fn test_tiny_refill_rate_saturates_retry_after() {
        let limiter = RateLimiter::new(1, 1e-20);
        let start = Instant::now();
        assert!(limiter.check_at("client", start).is_allowed());

        match limiter.check_at("client", start) {
            Decision::Denied { retry_after } => assert_eq!(retry_after, Duration::MAX),
            Decision::Allowed => panic!("expected denial"),
        }
    }

    #[test]
    fn test_zero_refill_rate_saturates_retry_after() {
        let limiter = RateLimiter::new(1, 0.0);
        let start = Instant::now();
        limiter.check_at("client", start);

        assert!(matches!(
            limiter.check_at("client", start),
            Decision::Denied { retry_after } if retry_after == Duration::MAX
        ));
    }

    #[test]
    fn test_allow_uses_wall_clock() {
        let limiter = RateLimiter::new(2, 0.0);

        assert!(limiter.allow("client"));
        assert!(limiter.allow("client"));
        assert!(!limiter.allow("client"));
        assert!(limiter.allow("other"));
    }
}
