//! CLI error types.

use slot_metrics::MetricsError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// The command line does not describe a usable poll.
    #[error("configuration error: {reason}")]
    Config {
        /// What is missing or wrong.
        reason: String,
    },

    /// The metrics library failed.
    #[error(transparent)]
    Metrics(#[from] MetricsError),

    /// Output formatting error.
    #[error("format error: {reason}")]
    Format {
        /// What could not be formatted.
        reason: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_error_display_config() {
        let err = CliError::Config {
            reason: "no ad source".into(),
        };
        assert_eq!(err.to_string(), "configuration error: no ad source");
    }

    #[test]
    fn cli_error_wraps_metrics_error() {
        let err = CliError::from(MetricsError::InvalidConfig {
            reason: "max_retries must be at least 1".into(),
        });
        assert_eq!(
            err.to_string(),
            "invalid configuration: max_retries must be at least 1"
        );
    }

    #[test]
    fn cli_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let cli_err = CliError::from(io_err);
        assert!(matches!(cli_err, CliError::Io(_)));
        assert_eq!(cli_err.to_string(), "IO error: closed");
    }
}
