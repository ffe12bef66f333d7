//! Per-actor rate limiting using a token bucket algorithm
//!
//! Buckets live in a [`RateLimitStore`], so the in-process [`MemoryStore`]
//! can be replaced by a shared store without touching callers. Every call
//! takes the current [`Instant`] explicitly.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Token bucket for a single actor
#[derive(Debug, Clone, PartialEq)]
pub struct TokenBucket {
    /// Current number of tokens
    tokens: f64,
    /// Maximum tokens (burst capacity)
    max_tokens: f64,
    /// Tokens added per second
    refill_rate: f64,
    /// Last time tokens were updated
    last_update: Instant,
}

impl TokenBucket {
    /// Create a full bucket
    pub fn new(max_tokens: f64, refill_rate: f64, now: Instant) -> Self {
        Self {
            tokens: max_tokens,
            max_tokens,
            refill_rate,
            last_update: now,
        }
    }

    /// Try to consume a token, refilling based on elapsed time
    pub fn try_consume(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.last_update = self.last_update.max(now);

        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Get remaining whole tokens
    pub fn remaining(&self) -> u32 {
        self.tokens as u32
    }

    /// Time until the next token is available
    pub fn retry_after(&self) -> Duration {
        if self.tokens >= 1.0 || self.refill_rate <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64((1.0 - self.tokens) / self.refill_rate)
    }

    pub fn last_update(&self) -> Instant {
        self.last_update
    }
}

/// Storage for token buckets keyed by actor
pub trait RateLimitStore: Send + Sync {
    /// Current bucket for a key
    fn get(&self, key: &str) -> Option<TokenBucket>;

    /// Replace the bucket for a key
    fn set(&self, key: &str, bucket: TokenBucket);

    /// Drop buckets not updated since `idle_since`, returning how many
    fn sweep(&self, idle_since: Instant) -> usize;

    /// Number of tracked keys
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process bucket store
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: Mutex<HashMap<String, TokenBucket>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // a poisoned map still holds valid buckets
    fn buckets(&self) -> MutexGuard<'_, HashMap<String, TokenBucket>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RateLimitStore for MemoryStore {
    fn get(&self, key: &str) -> Option<TokenBucket> {
        self.buckets().get(key).cloned()
    }

    fn set(&self, key: &str, bucket: TokenBucket) {
        self.buckets().insert(key.to_string(), bucket);
    }

    fn sweep(&self, idle_since: Instant) -> usize {
        let mut buckets = self.buckets();
        let before = buckets.len();
        buckets.retain(|_, bucket| bucket.last_update >= idle_since);
        before - buckets.len()
    }

    fn len(&self) -> usize {
        self.buckets().len()
    }
}

/// Rate limiter configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum mutations in the window
    pub requests: u32,
    /// Time window in seconds
    pub per_secs: u32,
}

impl RateLimitConfig {
    pub fn new(requests: u32, per_secs: u32) -> Self {
        Self { requests, per_secs }
    }

    /// Time for an empty bucket to refill completely
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.per_secs.max(1) as u64)
    }

    /// Tokens per second
    fn refill_rate(&self) -> f64 {
        self.requests as f64 / self.per_secs.max(1) as f64
    }
}

/// Result of a rate limit check
#[derive(Debug, Clone, PartialEq)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed { remaining: u32, limit: u32 },
    /// Request is rate limited
    Limited { retry_after: Duration, limit: u32 },
}

impl RateLimitResult {
    /// Check if the request is allowed
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }
}

/// Token bucket rate limiter over a pluggable store
///
/// `check` reads and writes the store in two steps; callers that share a
/// key across threads must serialize their checks.
#[derive(Debug)]
pub struct RateLimiter<S: RateLimitStore = MemoryStore> {
    store: S,
    config: RateLimitConfig,
}

impl RateLimiter<MemoryStore> {
    /// Create a limiter backed by a [`MemoryStore`]
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_store(config, MemoryStore::new())
    }
}

impl<S: RateLimitStore> RateLimiter<S> {
    pub fn with_store(config: RateLimitConfig, store: S) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Check whether `key` may act at `now`, consuming a token if so
    pub fn check(&self, key: &str, now: Instant) -> RateLimitResult {
        let mut bucket = self.store.get(key).unwrap_or_else(|| {
            TokenBucket::new(self.config.requests as f64, self.config.refill_rate(), now)
        });

        let result = if bucket.try_consume(now) {
            RateLimitResult::Allowed {
                remaining: bucket.remaining(),
                limit: self.config.requests,
            }
        } else {
            debug!(key, "rate limited");
            RateLimitResult::Limited {
                retry_after: bucket.retry_after(),
                limit: self.config.requests,
            }
        };

        self.store.set(key, bucket);
        result
    }

    /// Forget keys idle for longer than `max_idle`
    pub fn sweep(&self, now: Instant, max_idle: Duration) -> usize {
        let Some(idle_since) = now.checked_sub(max_idle) else {
            return 0;
        };
        let removed = self.store.sweep(idle_since);
        if removed > 0 {
            debug!(removed, "swept idle rate limit buckets");
        }
        removed
    }

    /// Sweep buckets idle for a full window once more than `max_tracked`
    /// keys are tracked
    ///
    /// A bucket idle for a whole window is full again, so dropping it is the
    /// same as keeping it.
    pub fn sweep_if_above(&self, now: Instant, max_tracked: usize) -> usize {
        if self.store.len() <= max_tracked {
            return 0;
        }
        self.sweep(now, self.config.window())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_limited() {
        let limiter = RateLimiter::new(RateLimitConfig::new(3, 60));
        let now = Instant::now();

        assert_eq!(
            limiter.check("ana", now),
            RateLimitResult::Allowed {
                remaining: 2,
                limit: 3
            }
        );
        assert!(limiter.check("ana", now).is_allowed());
        assert!(limiter.check("ana", now).is_allowed());

        match limiter.check("ana", now) {
            RateLimitResult::Limited { retry_after, limit } => {
                assert_eq!(limit, 3);
                assert!((retry_after.as_secs_f64() - 20.0).abs() < 1e-6);
            }
            other => panic!("expected limit, got {:?}", other),
        }

        // other actors have their own bucket
        assert!(limiter.check("bo", now).is_allowed());
    }

    #[test]
    fn test_refill() {
        let limiter = RateLimiter::new(RateLimitConfig::new(1, 10));
        let start = Instant::now();

        assert!(limiter.check("ana", start).is_allowed());
        assert!(!limiter.check("ana", start + Duration::from_secs(5)).is_allowed());
        assert!(limiter.check("ana", start + Duration::from_secs(11)).is_allowed());
    }

    #[test]
    fn test_bucket_ignores_clock_going_backwards() {
        let start = Instant::now() + Duration::from_secs(10);
        let mut bucket = TokenBucket::new(1.0, 1.0, start);
        assert!(bucket.try_consume(start));
        assert!(!bucket.try_consume(start - Duration::from_secs(5)));
        assert_eq!(bucket.last_update(), start);
    }

    #[test]
    fn test_sweep() {
        let limiter = RateLimiter::new(RateLimitConfig::new(5, 60));
        let start = Instant::now();

        limiter.check("ana", start);
        limiter.check("bo", start + Duration::from_secs(100));
        assert_eq!(limiter.store().len(), 2);

        let removed = limiter.sweep(start + Duration::from_secs(200), Duration::from_secs(150));
        assert_eq!(removed, 1);
        assert!(limiter.store().get("ana").is_none());
        assert!(limiter.store().get("bo").is_some());
    }

    #[test]
    fn test_sweep_if_above() {
        let limiter = RateLimiter::new(RateLimitConfig::new(2, 60));
        let start = Instant::now();

        for actor in ["ana", "bo", "cy"] {
            limiter.check(actor, start);
        }
        let later = start + Duration::from_secs(61);
        limiter.check("dee", later);

        assert_eq!(limiter.sweep_if_above(later, 4), 0);
        assert_eq!(limiter.store().len(), 4);

        assert_eq!(limiter.sweep_if_above(later, 2), 3);
        assert_eq!(limiter.store().len(), 1);

        // a swept actor starts again from a full bucket
        assert_eq!(
            limiter.check("ana", later),
            RateLimitResult::Allowed {
                remaining: 1,
                limit: 2
            }
        );
    }

    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        writes: Mutex<usize>,
    }

    impl RateLimitStore for CountingStore {
        fn get(&self, key: &str) -> Option<TokenBucket> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, bucket: TokenBucket) {
            *self.writes.lock().unwrap() += 1;
            self.inner.set(key, bucket);
        }

        fn sweep(&self, idle_since: Instant) -> usize {
            self.inner.sweep(idle_since)
        }

        fn len(&self) -> usize {
            self.inner.len()
        }
    }

    #[test]
    fn test_custom_store() {
        let limiter = RateLimiter::with_store(RateLimitConfig::new(1, 1), CountingStore::default());
        let now = Instant::now();
        limiter.check("ana", now);
        limiter.check("ana", now);
        assert_eq!(*limiter.store().writes.lock().unwrap(), 2);
        assert!(!limiter.store().is_empty());
    }
}
