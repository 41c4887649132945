//! Poll configuration.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};
use crate::retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, RetryPolicy};
use crate::types::MetricKey;

/// Pool polled when none is configured.
pub const DEFAULT_POOL: &str = "localhost";

/// Prefix put in front of every key written to a sink.
pub const DEFAULT_METRIC_PREFIX: &str = "condor";

/// Settings for one pool poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollConfig {
    /// Address of the pool manager; the local pool when absent.
    pub pool: Option<String>,
    /// Seconds to wait between two attempts.
    pub retry_delay: u64,
    /// Total number of attempts per round trip.
    pub max_retries: u32,
    /// Whether to emit `Partitionable.slot.<host>.*` keys.
    pub per_slot_detail: bool,
    /// Prefix for keys written to a sink; empty for none.
    pub metric_prefix: String,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            pool: None,
            retry_delay: DEFAULT_RETRY_DELAY.as_secs(),
            max_retries: DEFAULT_MAX_ATTEMPTS,
            per_slot_detail: false,
            metric_prefix: DEFAULT_METRIC_PREFIX.to_string(),
        }
    }
}

impl PollConfig {
    /// Loads and validates a JSON configuration file.
    ///
    /// Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::Io` if the file cannot be read and
    /// `MetricsError::InvalidConfig` if it does not parse or validate.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| MetricsError::InvalidConfig {
            reason: format!("{}: {e}", path.display()),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the pool address.
    #[must_use]
    pub fn with_pool(mut self, pool: impl Into<String>) -> Self {
        self.pool = Some(pool.into());
        self
    }

    /// Sets the delay between attempts, in seconds.
    #[must_use]
    pub const fn with_retry_delay(mut self, seconds: u64) -> Self {
        self.retry_delay = seconds;
        self
    }

    /// Sets the number of attempts.
    #[must_use]
    pub const fn with_max_retries(mut self, attempts: u32) -> Self {
        self.max_retries = attempts;
        self
    }

    /// Enables or disables per-slot detail keys.
    #[must_use]
    pub const fn with_per_slot_detail(mut self, enabled: bool) -> Self {
        self.per_slot_detail = enabled;
        self
    }

    /// Sets the sink key prefix.
    #[must_use]
    pub fn with_metric_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.metric_prefix = prefix.into();
        self
    }

    /// Checks that the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::InvalidConfig` if `max_retries` is zero or the
    /// prefix is not a valid key.
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(MetricsError::InvalidConfig {
                reason: "max_retries must be at least 1".to_string(),
            });
        }
        if self.pool.as_deref().is_some_and(str::is_empty) {
            return Err(MetricsError::InvalidConfig {
                reason: "pool cannot be empty".to_string(),
            });
        }
        self.prefix_key()
            .map(|_| ())
            .map_err(|e| MetricsError::InvalidConfig {
                reason: format!("metric_prefix: {e}"),
            })
    }

    /// Returns the pool address, or [`DEFAULT_POOL`].
    #[must_use]
    pub fn pool_name(&self) -> &str {
        self.pool.as_deref().unwrap_or(DEFAULT_POOL)
    }

    /// Returns the retry policy these settings describe.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(Duration::from_secs(self.retry_delay), self.max_retries)
    }

    /// Returns the sink prefix as a key, `None` when empty.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::InvalidMetricKey` if the prefix is malformed.
    pub fn prefix_key(&self) -> Result<Option<MetricKey>> {
        if self.metric_prefix.is_empty() {
            return Ok(None);
        }
        MetricKey::new(self.metric_prefix.clone()).map(Some)
    }
}
