//! Destinations for finished metric maps.

use std::io::Write;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::error::{MetricsError, Result};
use crate::types::{MetricKey, MetricMap};

/// Accepts finished metric maps.
///
/// A sink makes no promise about ordering or atomicity across keys.
pub trait MetricSink: Send + Sync {
    /// Writes every key of `metrics`.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::SinkError` if the destination rejects the write.
    fn emit(&self, metrics: &MetricMap) -> Result<()>;

    /// Returns the name of this sink for logging purposes.
    fn name(&self) -> &'static str;
}

/// Writes Graphite plaintext lines: `<prefix>.<key> <value> <unix-seconds>`.
#[derive(Debug)]
pub struct PlaintextSink<W> {
    writer: Mutex<W>,
    prefix: Option<MetricKey>,
    timestamp: Option<DateTime<Utc>>,
}

impl<W: Write + Send> PlaintextSink<W> {
    /// Creates a sink writing unprefixed keys to `writer`.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            prefix: None,
            timestamp: None,
        }
    }

    /// Puts `prefix` in front of every key.
    #[must_use]
    pub fn with_prefix(mut self, prefix: Option<MetricKey>) -> Self {
        self.prefix = prefix;
        self
    }

    /// Stamps every line with `timestamp` instead of the emit time.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Returns the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> MetricSink for PlaintextSink<W> {
    fn emit(&self, metrics: &MetricMap) -> Result<()> {
        let timestamp = self.timestamp.unwrap_or_else(Utc::now).timestamp();
        let mut writer = self.writer.lock();

        let write_lines = |writer: &mut W| -> std::io::Result<()> {
            for (key, value) in metrics.iter() {
                match &self.prefix {
                    Some(prefix) => writeln!(writer, "{prefix}.{key} {value} {timestamp}")?,
                    None => writeln!(writer, "{key} {value} {timestamp}")?,
                }
            }
            writer.flush()
        };
        write_lines(&mut *writer).map_err(|e| MetricsError::SinkError {
            reason: e.to_string(),
        })?;

        debug!(keys = metrics.len(), "wrote plaintext metrics");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "PlaintextSink"
    }
}

/// Keeps every emitted map in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    emitted: RwLock<Vec<MetricMap>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every map emitted so far, oldest first.
    #[must_use]
    pub fn emitted(&self) -> Vec<MetricMap> {
        self.emitted.read().clone()
    }

    /// Returns the most recently emitted map.
    #[must_use]
    pub fn last(&self) -> Option<MetricMap> {
        self.emitted.read().last().cloned()
    }
}

impl MetricSink for MemorySink {
    fn emit(&self, metrics: &MetricMap) -> Result<()> {
        self.emitted.write().push(metrics.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "MemorySink"
    }
}
