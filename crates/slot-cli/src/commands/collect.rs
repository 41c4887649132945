//! Collection commands: poll the pool once and print the metric map.

use std::io::Write;

use slot_metrics::{AdSource, MetricMap, PollConfig, PoolCollector};
use tracing::debug;

use crate::cli::Commands;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Runs one collection against an ad source.
pub struct CollectCommand<S> {
    collector: PoolCollector<S>,
}

impl<S: AdSource> CollectCommand<S> {
    /// Create a command polling `source` with `config`.
    #[must_use]
    pub fn new(source: S, config: &PollConfig) -> Self {
        Self {
            collector: PoolCollector::from_config(source, config),
        }
    }

    /// Wraps an already configured collector.
    #[must_use]
    pub const fn from_collector(collector: PoolCollector<S>) -> Self {
        Self { collector }
    }

    /// Collects the metrics `command` asks for.
    #[must_use]
    pub fn collect(&self, command: &Commands) -> MetricMap {
        debug!(pool = self.collector.pool(), command = ?command, "collecting");
        match command {
            Commands::Slots { .. } => self.collector.pool_slots(),
            Commands::Glideins => self.collector.glidein_slots(),
            Commands::Drain => self.collector.defrag_info(),
            Commands::Utilization => self.collector.resource_utilization(),
            Commands::All => self.collector.collect_all(),
        }
    }

    /// Execute the command.
    ///
    /// # Errors
    ///
    /// Returns an error if output fails.
    pub fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        command: &Commands,
    ) -> Result<(), CliError> {
        let metrics = self.collect(command);
        format.write_metrics(writer, &metrics)
    }
}
