//! Output formatting for CLI commands.
//!
//! Supports table (human-readable), JSON and Graphite plaintext output.

use std::io::Write;

use slot_metrics::{MetricKey, MetricMap, MetricSink, PlaintextSink};

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter for metric maps.
#[derive(Debug, Clone, Default)]
pub struct OutputFormat {
    format: Format,
    prefix: Option<MetricKey>,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self {
            format,
            prefix: None,
        }
    }

    /// Sets the key prefix used by plaintext output.
    #[must_use]
    pub fn with_prefix(mut self, prefix: Option<MetricKey>) -> Self {
        self.prefix = prefix;
        self
    }

    /// Get the current format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a metric map to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_metrics<W: Write>(&self, writer: &mut W, metrics: &MetricMap) -> Result<(), CliError> {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, metrics).map_err(|e| CliError::Format {
                    reason: format!("JSON serialization failed: {e}"),
                })?;
                writeln!(writer)?;
            }
            Format::Table => MetricTable(metrics).write_table(writer)?,
            Format::Plaintext => {
                // The sink wants an owned, sendable writer; buffer then copy.
                let sink = PlaintextSink::new(Vec::new()).with_prefix(self.prefix.clone());
                sink.emit(metrics)?;
                writer.write_all(&sink.into_inner())?;
            }
        }
        Ok(())
    }

    /// Write a metric map to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string(&self, metrics: &MetricMap) -> Result<String, CliError> {
        let mut buf = Vec::new();
        self.write_metrics(&mut buf, metrics)?;
        String::from_utf8(buf).map_err(|e| CliError::Format {
            reason: format!("UTF-8 error: {e}"),
        })
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// Two-column key/value view of a metric map.
#[derive(Debug, Clone, Copy)]
pub struct MetricTable<'a>(pub &'a MetricMap);

impl TableDisplay for MetricTable<'_> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.0.is_empty() {
            writeln!(writer, "No data")?;
            return Ok(());
        }

        let width = self
            .0
            .keys()
            .map(|k| k.as_str().len())
            .max()
            .unwrap_or(0)
            .max("KEY".len());

        writeln!(writer, "{:<width$}  {:>14}", "KEY", "VALUE")?;
        writeln!(writer, "{}", "─".repeat(width + 16))?;
        for (key, value) in self.0.iter() {
            writeln!(writer, "{:<width$}  {:>14}", key.as_str(), value.to_string())?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} metric(s)", self.0.len())?;
        Ok(())
    }
}
