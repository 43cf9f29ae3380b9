//! Generic bounded-retry helper (ambient addition, spec.md §4.10).
//!
//! Used by `collector`, `biller`, and the cache-write path in `heart`. Retries are
//! silent — callers only learn of failure once every attempt is exhausted.

use std::time::Duration;

use rand::Rng;

/// Exponential backoff with jitter, capped attempts, used for every retryable
/// operation named in spec.md §4.10.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1 << attempt.min(16));
        let capped = exp.min(self.max_delay);
        let jitter_ms = rand::thread_rng().gen_range(0..=capped.as_millis() as u64 / 2 + 1);
        capped / 2 + Duration::from_millis(jitter_ms)
    }

    /// Runs `op` until it succeeds or `max_attempts` is exhausted, sleeping between
    /// attempts per the backoff schedule. Returns the last error on exhaustion.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let mut last_err = None;
        for attempt in 0..self.max_attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    last_err = Some(err);
                    if attempt + 1 < self.max_attempts {
                        tokio::time::sleep(self.delay_for(attempt)).await;
                    }
                }
            }
        }
        Err(last_err.expect("loop runs at least once"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_on_first_attempt() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        };
        let result: Result<u32, &str> = policy.run(|| async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn exhausts_attempts_and_returns_last_error() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        };
        let attempts = AtomicU32::new(0);
        let result: Result<(), &str> = policy
            .run(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err("transient") }
            })
            .await;
        assert_eq!(result.unwrap_err(), "transient");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn recovers_after_an_initial_failure() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        };
        let attempts = AtomicU32::new(0);
        let result: Result<u32, &str> = policy
            .run(|| {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move { if n == 0 { Err("transient") } else { Ok(7) } }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
    }
}
