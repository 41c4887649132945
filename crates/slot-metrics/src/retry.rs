//! Bounded, fixed-delay retries around an [`AdSource`].

use std::thread;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::{MetricsError, Result};
use crate::query::{AdType, Query};
use crate::records::Ad;
use crate::source::{AdSource, ScheddLocation};

/// Default delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Default number of attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// How often and how patiently a failed round trip is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pause between two attempts.
    pub delay: Duration,
    /// Total number of attempts, the first one included.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RETRY_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts,
        }
    }

    /// A policy that tries `max_attempts` times without pausing.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self::new(Duration::ZERO, max_attempts)
    }

    /// Returns true if another attempt may follow attempt number `attempt` (1-based).
    #[must_use]
    pub const fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Longest time a fully failing call spends sleeping.
    #[must_use]
    pub fn worst_case_wait(&self) -> Duration {
        self.delay
            .saturating_mul(self.max_attempts.saturating_sub(1))
    }

    /// Runs `op` until it succeeds or the attempts run out.
    ///
    /// Each failed attempt that will be retried is logged at `warn`; running
    /// out is logged at `error`.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::RetriesExhausted` carrying the last failure.
    pub fn run<T, F>(&self, pool: &str, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let mut last_error = "no attempts allowed".to_string();
        let mut attempt = 0;

        while attempt < self.max_attempts {
            attempt += 1;
            match op() {
                Ok(value) => {
                    debug!(pool = %pool, what, attempt, "fetched");
                    return Ok(value);
                }
                Err(e) => {
                    last_error = e.to_string();
                    if self.should_retry(attempt) {
                        warn!(
                            pool = %pool,
                            what,
                            attempt,
                            error = %e,
                            "trouble getting pool {pool} {what}, retrying in {}s",
                            self.delay.as_secs()
                        );
                        thread::sleep(self.delay);
                    }
                }
            }
        }

        error!(pool = %pool, what, attempts = attempt, "trouble getting pool {pool} {what}, giving up");
        Err(MetricsError::RetriesExhausted {
            pool: pool.to_string(),
            attempts: attempt,
            reason: last_error,
        })
    }
}

/// An [`AdSource`] whose manager round trips are retried under a [`RetryPolicy`].
///
/// Schedd queries are attempted once: one unreachable schedd must not hold
/// up the rest of the poll.
#[derive(Debug, Clone)]
pub struct RetryingFetcher<S> {
    source: S,
    policy: RetryPolicy,
}

impl<S: AdSource> RetryingFetcher<S> {
    /// Wraps `source`.
    #[must_use]
    pub const fn new(source: S, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    /// Returns the wrapped source.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Queries the pool manager, retrying on failure.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::RetriesExhausted` when every attempt failed.
    pub fn fetch(&self, pool: &str, query: &Query) -> Result<Vec<Ad>> {
        let what = match query.ad_type {
            AdType::Startd => "startds",
            AdType::Schedd => "schedds",
            AdType::Any => "ads",
        };
        self.policy.run(pool, what, || self.source.query(pool, query))
    }

    /// Locates the pool's schedds, retrying on failure.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::RetriesExhausted` when every attempt failed.
    pub fn locate_schedds(&self, pool: &str) -> Result<Vec<ScheddLocation>> {
        self.policy
            .run(pool, "schedds", || self.source.locate_schedds(pool))
    }

    /// Queries one schedd, once.
    ///
    /// # Errors
    ///
    /// Returns the source's error unchanged.
    pub fn query_schedd(&self, schedd: &ScheddLocation, query: &Query) -> Result<Vec<Ad>> {
        self.source.query_schedd(schedd, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryAdSource;
    use std::cell::Cell;

    mod policy_tests {
        use super::*;

        #[test]
        fn default_policy() {
            let policy = RetryPolicy::default();
            assert_eq!(policy.delay, Duration::from_secs(30));
            assert_eq!(policy.max_attempts, 4);
            assert_eq!(policy.worst_case_wait(), Duration::from_secs(90));
        }

        #[test]
        fn should_retry_until_last_attempt() {
            let policy = RetryPolicy::immediate(3);
            assert!(policy.should_retry(1));
            assert!(policy.should_retry(2));
            assert!(!policy.should_retry(3));
        }

        #[test]
        fn first_success_is_returned() {
            let calls = Cell::new(0);
            let result = RetryPolicy::immediate(4).run("pool", "startds", || {
                calls.set(calls.get() + 1);
                Ok::<_, MetricsError>(7)
            });
            assert_eq!(result.ok(), Some(7));
            assert_eq!(calls.get(), 1);
        }

        #[test]
        fn succeeds_after_failures() {
            let calls = Cell::new(0);
            let result = RetryPolicy::immediate(4).run("pool", "startds", || {
                calls.set(calls.get() + 1);
                if calls.get() < 3 {
                    Err(MetricsError::query_failed("pool", "timeout"))
                } else {
                    Ok(calls.get())
                }
            });
            assert_eq!(result.ok(), Some(3));
        }

        #[test]
        fn exhaustion_reports_attempts_and_last_error() {
            let calls = Cell::new(0);
            let result: Result<()> = RetryPolicy::immediate(4).run("cm.example", "startds", || {
                calls.set(calls.get() + 1);
                Err(MetricsError::query_failed("cm.example", format!("failure {}", calls.get())))
            });
            assert_eq!(calls.get(), 4);
            match result {
                Err(MetricsError::RetriesExhausted {
                    pool,
                    attempts,
                    reason,
                }) => {
                    assert_eq!(pool, "cm.example");
                    assert_eq!(attempts, 4);
                    assert!(reason.ends_with("failure 4"));
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }

        #[test]
        fn zero_attempts_never_calls() {
            let calls = Cell::new(0);
            let result: Result<()> = RetryPolicy::immediate(0).run("pool", "ads", || {
                calls.set(calls.get() + 1);
                Ok(())
            });
            assert!(matches!(
                result,
                Err(MetricsError::RetriesExhausted { attempts: 0, .. })
            ));
            assert_eq!(calls.get(), 0);
        }
    }

    mod fetcher_tests {
        use super::*;

        #[test]
        fn fetch_retries_transient_failures() {
            let source = MemoryAdSource::new();
            source.fail_queries(2);
            let fetcher = RetryingFetcher::new(source, RetryPolicy::immediate(4));
            assert!(fetcher.fetch("pool", &Query::startd_slots()).is_ok());
            assert_eq!(fetcher.source().query_calls(), 3);
        }

        #[test]
        fn fetch_gives_up_after_max_attempts() {
            let source = MemoryAdSource::new();
            source.fail_queries(10);
            let fetcher = RetryingFetcher::new(source, RetryPolicy::immediate(4));
            assert!(fetcher.fetch("pool", &Query::startd_slots()).is_err());
            assert_eq!(fetcher.source().query_calls(), 4);
        }

        #[test]
        fn locate_is_retried() {
            let source = MemoryAdSource::new().with_schedd("submit01", Vec::new());
            source.fail_locates(3);
            let fetcher = RetryingFetcher::new(source, RetryPolicy::immediate(4));
            assert!(fetcher.locate_schedds("pool").is_ok_and(|s| s.len() == 1));
            assert_eq!(fetcher.source().locate_calls(), 4);
        }
    }
}
