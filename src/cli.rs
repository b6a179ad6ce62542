//! CLI interface for Lookout.
//!
//! Designed for schedulers and humans alike to drive the pipeline from the
//! command line. Each subcommand is non-interactive: arguments in, a short
//! summary out, details in the structured log.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::storage::Storage;
use crate::{alerts, ingest};

/// Lookout: ingest vessel logbooks, raise alerts.
#[derive(Debug, Parser)]
#[command(name = "lookout", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    /// Path to the config file. Defaults to `~/.lookout/config.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r"Workflow: draining a day's transmissions
  1. lookout ingest
     → classifies received archives, parses their messages, loads reports
     Re-invoke until it reports 0 archives: each run handles at most 200.
  2. lookout alerts missing-reports
     → rebuilds the pending alerts for vessels at sea with no fishing report

Files that fail classification or extraction are moved to the error
directory under their date partition; parse failures of single messages
are logged and never block the rest of an archive.";

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest received logbook archives: classify, parse, and load.
    ///
    /// Handles at most 200 archives per invocation; re-run to drain.
    Ingest,

    /// Build and reconcile alerts.
    Alerts {
        #[command(subcommand)]
        command: AlertCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum AlertCommand {
    /// Replace the pending alerts for vessels at sea missing a fishing
    /// report, honoring operator silencing.
    MissingReports {
        /// Type tag stamped on every built alert.
        #[arg(long, default_value = "MISSING_FAR_ALERT")]
        alert_type: String,

        /// Config name keying the replaced slice of the pending alerts.
        #[arg(long, default_value = "MISSING_FAR_ALERT")]
        config_name: String,

        /// Look-back window in hours. Defaults to the configured value.
        #[arg(long)]
        window_hours: Option<i64>,
    },
}

/// Run the CLI, returning an error message on failure.
pub fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let mut storage = Storage::open(&config.database)
        .map_err(|e| format!("failed to open storage: {e}"))?;

    match cli.command {
        Command::Ingest => cmd_ingest(&config, &mut storage),
        Command::Alerts { command } => match command {
            AlertCommand::MissingReports {
                alert_type,
                config_name,
                window_hours,
            } => cmd_missing_reports(
                &config,
                &mut storage,
                &alert_type,
                &config_name,
                window_hours,
            ),
        },
    }
}

fn cmd_ingest(config: &Config, storage: &mut Storage) -> Result<(), String> {
    let summary = ingest::run(config, storage).map_err(|e| format!("ingestion failed: {e}"))?;

    println!(
        "{} archives treated, {} errored; {} reports, {} raw messages, {} parse errors",
        summary.archives_treated,
        summary.archives_errored,
        summary.reports_written,
        summary.raw_messages_written,
        summary.parse_errors,
    );
    Ok(())
}

fn cmd_missing_reports(
    config: &Config,
    storage: &mut Storage,
    alert_type: &str,
    config_name: &str,
    window_hours: Option<i64>,
) -> Result<(), String> {
    let window_hours = window_hours.unwrap_or(config.alert_window_hours);
    let loaded = alerts::run_missing_reports(storage, alert_type, config_name, window_hours)
        .map_err(|e| format!("alert run failed: {e}"))?;

    println!("{loaded} pending alerts loaded for {config_name}");
    Ok(())
}
