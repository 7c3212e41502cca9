//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Outreach - collect contact records and dispatch throttled messages
#[derive(Parser, Debug)]
#[command(
    name = "outreach",
    author,
    version,
    about = "Outreach collection and dispatch pipeline",
    long_about = "Collects candidate contact records from configured sources, merges and \n\
                  deduplicates them into a record store, and dispatches one message per \n\
                  recipient under a daily quota with throttling and bounded retry."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "OUTREACH_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "OUTREACH_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Prometheus metrics port (disabled when unset)
    #[arg(long, global = true, env = "OUTREACH_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every enabled source and append the results to the record store
    Collect(CollectArgs),

    /// Send one batch to the records in the store
    Dispatch(DispatchArgs),

    /// Collect, then dispatch
    Run(DispatchArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Inspect or reset the delivery ledger
    Ledger(LedgerArgs),
}

/// Configuration file argument shared by every command
#[derive(Args, Debug, Clone)]
pub struct ConfigArg {
    /// Path to campaign configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "OUTREACH_CONFIG"
    )]
    pub config: PathBuf,
}

/// Arguments for the `collect` command
#[derive(Args, Debug, Clone)]
pub struct CollectArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Override the collector concurrency limit
    #[arg(long, env = "OUTREACH_CONCURRENCY")]
    pub concurrency: Option<usize>,
}

/// Arguments for the `dispatch` and `run` commands
#[derive(Args, Debug, Clone)]
pub struct DispatchArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Stop after this many attempted recipients
    #[arg(long, env = "OUTREACH_MAX_BATCH")]
    pub max_batch: Option<usize>,

    /// Override the daily quota from configuration
    #[arg(long, env = "OUTREACH_MAX_PER_DAY")]
    pub max_per_day: Option<u32>,

    /// Use a throwaway copy of the ledger and log messages instead of sending
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `ledger` command
#[derive(Args, Debug)]
pub struct LedgerArgs {
    #[command(subcommand)]
    pub action: LedgerAction,
}

/// Ledger operations
#[derive(Subcommand, Debug)]
pub enum LedgerAction {
    /// Show delivery counts and today's quota
    Status(LedgerStatusArgs),

    /// Forget every delivery outcome and reset the quota
    Clear(LedgerClearArgs),
}

#[derive(Args, Debug)]
pub struct LedgerStatusArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// List every recipient entry
    #[arg(long)]
    pub entries: bool,
}

#[derive(Args, Debug)]
pub struct LedgerClearArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
