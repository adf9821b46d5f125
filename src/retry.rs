//! Retry policy, delay calculation, and the shared retry executor.
//!
//! [`RetryPolicy`] controls backoff behaviour; [`with_retry`] wraps a
//! fallible async operation with classification-driven retry. Retry
//! eligibility is decided solely by [`BifrostError::is_retryable()`] —
//! rate limits, timeouts, network failures, and 429/5xx statuses.
//! Permanent errors propagate on first occurrence.
//!
//! Backoff: a server-specified `retry_after` hint is used verbatim
//! (capped at `max_delay`); otherwise `initial_delay * multiplier^attempt`,
//! optionally inflated by up to 25% random jitter, capped at `max_delay`.
//! The sleep happens outside any lock.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::{BifrostError, Result};
use crate::telemetry;

/// Configuration for retry behaviour on transient errors.
///
/// Uses exponential backoff with optional jitter:
///
/// ```rust
/// # use bifrost::RetryPolicy;
/// # use std::time::Duration;
/// let policy = RetryPolicy::new()
///     .max_retries(5)
///     .initial_delay(Duration::from_millis(200))
///     .jitter(true);
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    /// 0 = no retry. Default: 3.
    pub max_retries: u32,
    /// Base delay before the first retry. Default: 500ms.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth and
    /// server hints). Default: 30s.
    pub max_delay: Duration,
    /// Exponential growth factor. Default: 2.0.
    pub backoff_multiplier: f64,
    /// Whether to inflate delays by up to 25% random jitter. Default: true.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Create a new policy with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a policy that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Set the maximum number of retries after the initial attempt.
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Set the base delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the exponential growth factor.
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enable or disable jitter.
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    ///
    /// `initial_delay * multiplier^attempt`, capped at `max_delay`.
    /// Does NOT include jitter — see [`effective_delay()`](Self::effective_delay)
    /// for the full calculation.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.max(0.0).powi(attempt as i32);
        let delay = self.initial_delay.mul_f64(factor.min(1e9));
        delay.min(self.max_delay)
    }

    /// Calculate the effective delay, respecting provider `retry_after`
    /// hints. A hint takes precedence over the computed backoff but is
    /// still capped at `max_delay`. Jitter, when enabled, inflates the
    /// result by up to 25% (and is itself capped).
    pub fn effective_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let base = match retry_after {
            Some(hint) => hint.min(self.max_delay),
            None => self.delay_for_attempt(attempt),
        };
        if self.jitter {
            let inflation = 1.0 + rand::rng().random_range(0.0..=0.25);
            base.mul_f64(inflation).min(self.max_delay)
        } else {
            base
        }
    }
}

/// Execute an async operation with retry logic.
///
/// Retries transient errors up to `policy.max_retries` times, using
/// exponential backoff and respecting `retry_after` hints from rate-limit
/// errors. `on_retry` fires before each sleep with the 1-based attempt
/// number, the error, and the chosen delay — callers use it for
/// rate-limit bookkeeping. Exhausting retries returns the last error.
pub async fn with_retry<F, Fut, T, C>(
    policy: &RetryPolicy,
    provider: &str,
    operation: &str,
    mut on_retry: C,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
    C: FnMut(u32, &BifrostError, Duration),
{
    let mut last_err = None;
    for attempt in 0..=policy.max_retries {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_retryable() => {
                metrics::counter!(telemetry::RETRIES_TOTAL,
                    "provider" => provider.to_owned(),
                    "capability" => operation.to_owned(),
                )
                .increment(1);
                if attempt < policy.max_retries {
                    let delay = policy.effective_delay(attempt, e.retry_after());
                    warn!(
                        provider,
                        operation,
                        attempt = attempt + 1,
                        max_retries = policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    on_retry(attempt + 1, &e, delay);
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e), // permanent error, no retry
        }
    }
    Err(last_err.unwrap_or(BifrostError::Unknown("retry loop without attempts".into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new()
            .max_retries(3)
            .initial_delay(Duration::from_millis(1))
            .jitter(false)
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::new()
            .initial_delay(Duration::from_millis(1000))
            .backoff_multiplier(2.0)
            .jitter(false);
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(4000));
    }

    #[test]
    fn backoff_capped_at_max_delay() {
        let policy = RetryPolicy::new()
            .initial_delay(Duration::from_millis(1000))
            .max_delay(Duration::from_millis(2500))
            .jitter(false);
        assert_eq!(policy.delay_for_attempt(5), Duration::from_millis(2500));
    }

    #[test]
    fn retry_after_hint_takes_precedence() {
        let policy = fast_policy();
        let delay = policy.effective_delay(0, Some(Duration::from_millis(250)));
        assert_eq!(delay, Duration::from_millis(250));
    }

    #[test]
    fn retry_after_hint_capped() {
        let policy = fast_policy().max_delay(Duration::from_secs(5));
        let delay = policy.effective_delay(0, Some(Duration::from_secs(600)));
        assert_eq!(delay, Duration::from_secs(5));
    }

    #[test]
    fn jitter_inflates_within_bounds() {
        let policy = RetryPolicy::new()
            .initial_delay(Duration::from_millis(1000))
            .jitter(true);
        for _ in 0..50 {
            let delay = policy.effective_delay(0, None);
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(1250));
        }
    }

    #[tokio::test]
    async fn succeeds_without_retry() {
        let result = with_retry(&fast_policy(), "p", "op", |_, _, _| {}, || async {
            Ok::<_, BifrostError>(42)
        })
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn on_retry_sees_attempts_and_delays() {
        use std::sync::Mutex;
        let seen: Mutex<Vec<(u32, u128)>> = Mutex::new(Vec::new());
        let calls = std::sync::atomic::AtomicU32::new(0);

        let policy = RetryPolicy::new()
            .max_retries(2)
            .initial_delay(Duration::from_millis(2))
            .jitter(false);
        let result: Result<()> = with_retry(
            &policy,
            "p",
            "op",
            |attempt, _err, delay| {
                seen.lock().unwrap().push((attempt, delay.as_millis()));
            },
            || {
                calls.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                async { Err(BifrostError::Network("reset".into())) }
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(std::sync::atomic::Ordering::Relaxed), 3);
        assert_eq!(*seen.lock().unwrap(), vec![(1, 2), (2, 4)]);
    }
}
