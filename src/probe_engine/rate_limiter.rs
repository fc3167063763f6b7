//! Token bucket rate limiter shared by every probe
//!
//! Bounds total navigation throughput to `max_requests` per `interval`. The
//! bucket itself is lock-free (fixed-point tokens in atomics); waiters queue
//! on a tokio mutex, which hands out the lock in FIFO order, so a waiter is
//! never starved once tokens become available.
//!
//! Key properties:
//! - Bucket starts full, capacity = `max_requests` (no burst beyond that)
//! - Continuous refill at `max_requests / interval`
//! - `try_acquire` never blocks; `acquire_token` sleeps until a token is granted

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Scaling factor for fixed-point token arithmetic (1000x precision)
const TOKEN_SCALE: u64 = 1000;

/// Rate limit decision for a single token request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Token consumed, the caller may proceed
    Allow,
    /// Bucket empty; contains the duration until the next token is available
    Deny { retry_after: Duration },
}

/// Token bucket gate bounding probes per interval
#[derive(Debug)]
pub struct RateLimiter {
    /// Current available tokens scaled by `TOKEN_SCALE`
    tokens: AtomicU64,
    /// Last refill timestamp as nanoseconds since `base`
    last_refill_nanos: AtomicU64,
    /// Maximum tokens scaled by `TOKEN_SCALE`
    max_tokens: u64,
    /// Refill interval in nanoseconds; `max_tokens` accrue per interval
    interval_nanos: u64,
    base: Instant,
    /// FIFO queue for `acquire_token` waiters
    gate: Mutex<()>,
}

impl RateLimiter {
    /// Create a limiter allowing `max_requests` per `interval`
    ///
    /// `max_requests` is clamped to at least 1 and `interval` to at least 1ms.
    #[must_use]
    pub fn new(max_requests: u32, interval: Duration) -> Self {
        let max_tokens = u64::from(max_requests.max(1)) * TOKEN_SCALE;
        let interval_nanos =
            u64::try_from(interval.as_nanos()).unwrap_or(u64::MAX).max(1_000_000);

        Self {
            tokens: AtomicU64::new(max_tokens),
            last_refill_nanos: AtomicU64::new(0),
            max_tokens,
            interval_nanos,
            base: Instant::now(),
            gate: Mutex::new(()),
        }
    }

    /// Bucket capacity in whole tokens
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.max_tokens / TOKEN_SCALE
    }

    /// Tokens currently available (whole tokens, after refill)
    #[must_use]
    pub fn available_tokens(&self) -> u64 {
        self.refill_tokens(self.now_nanos());
        self.tokens.load(Ordering::Relaxed) / TOKEN_SCALE
    }

    /// Suspend until a token is available, then consume it
    pub async fn acquire_token(&self) {
        let _turn = self.gate.lock().await;
        loop {
            match self.try_acquire() {
                RateLimitDecision::Allow => return,
                RateLimitDecision::Deny { retry_after } => {
                    tokio::time::sleep(retry_after).await;
                }
            }
        }
    }

    /// Attempt to consume one token without waiting
    #[inline]
    pub fn try_acquire(&self) -> RateLimitDecision {
        self.refill_tokens(self.now_nanos());

        loop {
            let current_tokens = self.tokens.load(Ordering::Relaxed);
            if current_tokens < TOKEN_SCALE {
                let tokens_needed = TOKEN_SCALE - current_tokens;
                let nanos_needed = self.nanos_for_tokens(tokens_needed).max(1_000_000);
                return RateLimitDecision::Deny {
                    retry_after: Duration::from_nanos(nanos_needed),
                };
            }

            match self.tokens.compare_exchange_weak(
                current_tokens,
                current_tokens - TOKEN_SCALE,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return RateLimitDecision::Allow,
                Err(_) => continue,
            }
        }
    }

    #[inline]
    fn now_nanos(&self) -> u64 {
        u64::try_from(self.base.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    /// Scaled tokens produced by `nanos` of elapsed time
    #[inline]
    fn tokens_for_nanos(&self, nanos: u64) -> u64 {
        let tokens = u128::from(nanos) * u128::from(self.max_tokens) / u128::from(self.interval_nanos);
        u64::try_from(tokens).unwrap_or(u64::MAX)
    }

    /// Nanoseconds needed to produce `tokens` scaled tokens, rounded up
    #[inline]
    fn nanos_for_tokens(&self, tokens: u64) -> u64 {
        let nanos = (u128::from(tokens) * u128::from(self.interval_nanos))
            .div_ceil(u128::from(self.max_tokens));
        u64::try_from(nanos).unwrap_or(u64::MAX)
    }

    /// Refill tokens based on elapsed time since last refill
    ///
    /// Only advances `last_refill_nanos` by the time that actually produced
    /// tokens, so fractional progress is kept for the next caller instead of
    /// being discarded when elapsed time is too small to yield a token.
    #[inline]
    fn refill_tokens(&self, now_nanos: u64) {
        loop {
            let last_refill = self.last_refill_nanos.load(Ordering::Relaxed);
            if now_nanos <= last_refill {
                break;
            }

            let tokens_to_add = self.tokens_for_nanos(now_nanos - last_refill);
            if tokens_to_add == 0 {
                break;
            }

            let current = self.tokens.load(Ordering::Relaxed);
            // A full bucket gains nothing; move the clock to now so idle time
            // does not bank into a burst later
            let new_last_refill = if current >= self.max_tokens {
                now_nanos
            } else {
                last_refill.saturating_add(
                    (u128::from(tokens_to_add) * u128::from(self.interval_nanos)
                        / u128::from(self.max_tokens))
                    .try_into()
                    .unwrap_or(u64::MAX),
                )
            };

            match self.last_refill_nanos.compare_exchange_weak(
                last_refill,
                new_last_refill,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    let _ = self
                        .tokens
                        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                            let new_tokens =
                                current.saturating_add(tokens_to_add).min(self.max_tokens);
                            (new_tokens != current).then_some(new_tokens)
                        });
                    break;
                }
                Err(_) => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_bucket_starts_full_and_denies_overflow() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        assert_eq!(limiter.capacity(), 3);

        for _ in 0..3 {
            assert_eq!(limiter.try_acquire(), RateLimitDecision::Allow);
        }
        match limiter.try_acquire() {
            RateLimitDecision::Deny { retry_after } => {
                // One token per 20s at this rate
                assert!(retry_after > Duration::from_secs(15));
                assert!(retry_after <= Duration::from_secs(20));
            }
            RateLimitDecision::Allow => panic!("bucket should be empty"),
        }
    }

    #[test]
    fn test_zero_requests_clamped() {
        let limiter = RateLimiter::new(0, Duration::ZERO);
        assert_eq!(limiter.capacity(), 1);
        assert_eq!(limiter.try_acquire(), RateLimitDecision::Allow);
    }

    #[tokio::test]
    async fn test_refill_restores_tokens() {
        let limiter = RateLimiter::new(2, Duration::from_millis(100));
        assert_eq!(limiter.try_acquire(), RateLimitDecision::Allow);
        assert_eq!(limiter.try_acquire(), RateLimitDecision::Allow);
        assert!(matches!(limiter.try_acquire(), RateLimitDecision::Deny { .. }));

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(limiter.available_tokens(), 2);
    }

    #[tokio::test]
    async fn test_acquire_token_delays_overflow() {
        let limiter = RateLimiter::new(5, Duration::from_millis(200));
        let start = Instant::now();

        for _ in 0..5 {
            limiter.acquire_token().await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));

        // Five more tokens need a full interval of refill
        for _ in 0..5 {
            limiter.acquire_token().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_concurrent_waiters_all_complete() {
        let limiter = Arc::new(RateLimiter::new(4, Duration::from_millis(100)));
        let mut handles = Vec::new();
        for _ in 0..12 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move { limiter.acquire_token().await }));
        }

        let start = Instant::now();
        for handle in handles {
            handle.await.expect("waiter task panicked");
        }
        // 8 tokens beyond capacity at 40/s
        assert!(start.elapsed() >= Duration::from_millis(150));
    }
}
