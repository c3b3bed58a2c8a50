//! Fixed-delay retry loop for resolving a single link.
//!
//! Every resolution failure is retried the same way: a timeout or a network
//! error is an ordinary failure here. The loop stops at the first success or
//! after [`RetryPolicy::max_attempts`] calls.
//!
//! # Example
//!
//! ```
//! use sharekeeper_core::maintenance::{RetryDecision, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(3, Duration::from_secs(2));
//! assert!(matches!(policy.should_retry(1), RetryDecision::Retry { attempt: 2, .. }));
//! assert!(matches!(policy.should_retry(3), RetryDecision::DoNotRetry { .. }));
//! ```

use std::time::Duration;

use tracing::{debug, instrument};

use crate::resolver::{LinkResolver, ResolveError, ResolvedUrl};

use super::RunStats;

/// Default maximum attempts per link per run.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause between a failed attempt and the next one.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Decision on whether to retry a failed resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Give up on this link for the current run.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Retry configuration: attempt bound and a fixed delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Returns the maximum number of attempts (including the first).
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the pause between attempts.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Decides what happens after `attempt` (1-indexed) failed.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        RetryDecision::Retry {
            delay: self.delay,
            attempt: attempt + 1,
        }
    }
}

/// Final failure of a link's retry loop.
#[derive(Debug, Clone)]
pub struct RetryExhausted {
    /// Error from the last attempt.
    pub last_error: ResolveError,
    /// Number of attempts made.
    pub attempts: u32,
}

/// Resolves `url` with up to `policy.max_attempts()` calls.
///
/// Each retry (not the first attempt) increments `stats.retried`.
///
/// # Errors
///
/// Returns [`RetryExhausted`] carrying the last error when every attempt failed.
#[instrument(skip(resolver, policy, stats), fields(max_attempts = policy.max_attempts()))]
pub async fn resolve_with_retry(
    resolver: &dyn LinkResolver,
    url: &str,
    policy: &RetryPolicy,
    stats: &RunStats,
) -> Result<ResolvedUrl, RetryExhausted> {
    let mut attempt = 1;
    loop {
        match resolver.resolve(url).await {
            Ok(resolved) => {
                debug!(attempt, direct_url = %resolved.url, "link resolved");
                return Ok(resolved);
            }
            Err(error) => match policy.should_retry(attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next,
                } => {
                    debug!(
                        attempt,
                        next_attempt = next,
                        delay_ms = delay.as_millis(),
                        error = %error.reason(),
                        "resolution failed, will retry"
                    );
                    stats.increment_retried();
                    tokio::time::sleep(delay).await;
                    attempt = next;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(attempt, reason = %reason, "giving up on link");
                    return Err(RetryExhausted {
                        last_error: error,
                        attempts: attempt,
                    });
                }
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;

    /// Fails `failures` times, then succeeds.
    struct FlakyResolver {
        failures: u32,
        calls: AtomicU32,
        seen: Mutex<Vec<String>>,
    }

    impl FlakyResolver {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LinkResolver for FlakyResolver {
        async fn resolve(&self, share_url: &str) -> Result<ResolvedUrl, ResolveError> {
            self.seen.lock().unwrap().push(share_url.to_string());
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Err(ResolveError::page_load(share_url, 503))
            } else {
                Ok(ResolvedUrl::new("https://cdn.example/f.bin", 200, "flaky"))
            }
        }
    }

    const URL: &str = "https://share.example/s/a";

    #[test]
    fn test_default_policy_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_new_clamps_zero_attempts() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }

    #[test]
    fn test_should_retry_uses_fixed_delay() {
        let policy = RetryPolicy::new(4, Duration::from_millis(250));
        for attempt in 1..4 {
            assert_eq!(
                policy.should_retry(attempt),
                RetryDecision::Retry {
                    delay: Duration::from_millis(250),
                    attempt: attempt + 1,
                }
            );
        }
        assert!(matches!(
            policy.should_retry(4),
            RetryDecision::DoNotRetry { .. }
        ));
    }

    #[tokio::test]
    async fn test_stops_on_first_success() {
        let resolver = FlakyResolver::new(1);
        let stats = RunStats::new();
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let resolved = resolve_with_retry(&resolver, URL, &policy, &stats)
            .await
            .unwrap();

        assert_eq!(resolved.url, "https://cdn.example/f.bin");
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
        assert_eq!(stats.retried(), 1);
    }

    #[tokio::test]
    async fn test_never_exceeds_max_attempts() {
        let resolver = FlakyResolver::new(u32::MAX);
        let stats = RunStats::new();
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let failure = resolve_with_retry(&resolver, URL, &policy, &stats)
            .await
            .unwrap_err();

        assert_eq!(failure.attempts, 3);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 3);
        assert!(matches!(
            failure.last_error,
            ResolveError::PageLoad { status: 503, .. }
        ));
        assert!(resolver.seen.lock().unwrap().iter().all(|u| u == URL));
    }

    #[tokio::test]
    async fn test_waits_retry_delay_between_attempts() {
        let resolver = FlakyResolver::new(2);
        let stats = RunStats::new();
        let policy = RetryPolicy::new(3, Duration::from_millis(40));

        let started = std::time::Instant::now();
        resolve_with_retry(&resolver, URL, &policy, &stats)
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(80));
    }
}
