//! Error types for the slot-metrics crate.

use thiserror::Error;

/// Errors that can occur while collecting pool metrics.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The metric key is invalid (empty or contains an empty segment).
    #[error("invalid metric key: {reason}")]
    InvalidMetricKey {
        /// The reason the key is invalid.
        reason: String,
    },

    /// The ad source could not answer a query.
    #[error("query failed for pool {pool}: {reason}")]
    QueryFailed {
        /// The pool that was queried.
        pool: String,
        /// The reason the query failed.
        reason: String,
    },

    /// Every attempt allowed by the retry policy failed.
    #[error("giving up on pool {pool} after {attempts} attempt(s): {reason}")]
    RetriesExhausted {
        /// The pool that was queried.
        pool: String,
        /// How many attempts were made.
        attempts: u32,
        /// The reason the last attempt failed.
        reason: String,
    },

    /// An ad could not be decoded into a typed record.
    #[error("malformed ad: {reason}")]
    MalformedAd {
        /// What was wrong with the ad.
        reason: String,
    },

    /// A configuration value is out of range or unparsable.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// The reason the configuration is invalid.
        reason: String,
    },

    /// Writing metrics to a sink failed.
    #[error("sink error: {reason}")]
    SinkError {
        /// The reason the sink failed.
        reason: String,
    },

    /// Reading an ad dump or configuration file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MetricsError {
    /// Shorthand for a [`MetricsError::QueryFailed`].
    pub fn query_failed(pool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::QueryFailed {
            pool: pool.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for metrics operations.
pub type Result<T> = std::result::Result<T, MetricsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_invalid_metric_key() {
        let err = MetricsError::InvalidMetricKey {
            reason: "empty segment".to_string(),
        };
        assert_eq!(err.to_string(), "invalid metric key: empty segment");
    }

    #[test]
    fn error_display_query_failed() {
        let err = MetricsError::query_failed("cm.example.org", "connection refused");
        assert_eq!(
            err.to_string(),
            "query failed for pool cm.example.org: connection refused"
        );
    }

    #[test]
    fn error_display_retries_exhausted() {
        let err = MetricsError::RetriesExhausted {
            pool: "cm.example.org".to_string(),
            attempts: 4,
            reason: "timeout".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "giving up on pool cm.example.org after 4 attempt(s): timeout"
        );
    }

    #[test]
    fn error_display_malformed_ad() {
        let err = MetricsError::MalformedAd {
            reason: "Cpus is not a number".to_string(),
        };
        assert_eq!(err.to_string(), "malformed ad: Cpus is not a number");
    }

    #[test]
    fn error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "startd.json");
        let err = MetricsError::from(io_err);
        assert!(matches!(err, MetricsError::Io(_)));
        assert_eq!(err.to_string(), "io error: startd.json");
    }
}
