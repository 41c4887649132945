//! # slot-cli
//!
//! `slotstat`, a command-line front end to `slot-metrics`.
//!
//! Each subcommand runs one collection against the pool and prints the
//! resulting metric map as a table, a JSON object or Graphite plaintext
//! lines.
//!
//! ```text
//! ┌──────────┐   ads (JSON dumps)   ┌──────────────┐
//! │ slotstat │◄─────────────────────│ DirAdSource  │
//! └──────────┘                      └──────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::io::Write;

use slot_metrics::DirAdSource;

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format};
pub use commands::CollectCommand;
pub use error::CliError;
pub use output::OutputFormat;

/// Runs the command `cli` describes and writes its output to `out`.
///
/// # Errors
///
/// Returns an error if no ad source is configured, the configuration is
/// invalid or writing fails. Pool query failures are not errors; they
/// produce empty output.
pub fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<(), CliError> {
    let config = cli.poll_config()?;
    let Some(ads) = &cli.ads else {
        return Err(CliError::Config {
            reason: "no ad source: pass --ads or set SLOTSTAT_ADS".to_string(),
        });
    };

    let format = OutputFormat::new(cli.format).with_prefix(config.prefix_key()?);
    let command = CollectCommand::new(DirAdSource::new(ads), &config);
    command.execute(out, &format, &cli.command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_ad_source_is_config_error() {
        let cli = Cli::parse_from(["slotstat", "drain"]);
        let mut out = Vec::new();
        let result = run(&cli, &mut out);
        assert!(matches!(result, Err(CliError::Config { .. })));
        assert!(out.is_empty());
    }

    #[test]
    fn runs_against_ad_directory() {
        let dir = TempDir::new().expect("create temp dir");
        fs::write(
            dir.path().join("any.json"),
            r#"[{"MyType": "Defrag", "WholeMachines": 7}]"#,
        )
        .expect("write ads");

        let ads = dir.path().to_string_lossy().to_string();
        let cli = Cli::parse_from(["slotstat", "--ads", &ads, "--format", "json", "drain"]);
        let mut out = Vec::new();
        run(&cli, &mut out).expect("run");
        let value: serde_json::Value = serde_json::from_slice(&out).expect("valid json");
        assert_eq!(value, serde_json::json!({"WholeMachines": 7}));
    }
}
