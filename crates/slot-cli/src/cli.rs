//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use slot_metrics::PollConfig;

use crate::error::CliError;

/// slotstat - capacity metrics for HTCondor-style batch pools.
#[derive(Parser, Debug, Clone)]
#[command(name = "slotstat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Pool manager address.
    #[arg(short, long, env = "SLOTSTAT_POOL")]
    pub pool: Option<String>,

    /// Directory of JSON ad dumps to read instead of a live pool.
    #[arg(short, long, env = "SLOTSTAT_ADS", value_name = "DIR")]
    pub ads: Option<PathBuf>,

    /// JSON configuration file; flags override its values.
    #[arg(short, long, env = "SLOTSTAT_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Seconds to wait between attempts.
    #[arg(long, env = "SLOTSTAT_RETRY_DELAY", value_name = "SECONDS")]
    pub retry_delay: Option<u64>,

    /// Total attempts per round trip.
    #[arg(long, env = "SLOTSTAT_MAX_RETRIES", value_name = "N")]
    pub max_retries: Option<u32>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Key prefix for plaintext output.
    #[arg(long, env = "SLOTSTAT_PREFIX")]
    pub prefix: Option<String>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON object for scripting.
    Json,
    /// Graphite plaintext lines.
    Plaintext,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Slot capacity by type, state, group and owner.
    Slots {
        /// Also report each partitionable slot by host.
        #[arg(long)]
        per_slot: bool,
    },

    /// Glidein slots by site, resource and owner.
    Glideins,

    /// Drain daemon statistics.
    Drain,

    /// Memory and disk used by running jobs.
    Utilization,

    /// Everything above, merged.
    All,
}

impl Cli {
    /// Builds the poll configuration: the config file (or defaults) with
    /// command-line values layered on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded or the result
    /// does not validate.
    pub fn poll_config(&self) -> Result<PollConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => PollConfig::from_file(path)?,
            None => PollConfig::default(),
        };

        if let Some(pool) = &self.pool {
            config = config.with_pool(pool.clone());
        }
        if let Some(delay) = self.retry_delay {
            config = config.with_retry_delay(delay);
        }
        if let Some(attempts) = self.max_retries {
            config = config.with_max_retries(attempts);
        }
        if let Some(prefix) = &self.prefix {
            config = config.with_metric_prefix(prefix.clone());
        }
        if let Commands::Slots { per_slot: true } = self.command {
            config = config.with_per_slot_detail(true);
        }

        config.validate()?;
        Ok(config)
    }
}
