//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Topic Relay - Concurrent, transactional record dispatch to a message broker
#[derive(Parser, Debug)]
#[command(
    name = "topic-relay",
    author,
    version,
    about = "Concurrent record dispatch pipeline",
    long_about = "Dispatches line-oriented source files into broker topics.\n\n\
                  Runs one worker per task over a shared publish session, or a \n\
                  single atomic transaction across all tasks when a transactional \n\
                  identity is configured. The session is flushed and closed exactly \n\
                  once, after every worker has finished."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TOPIC_RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TOPIC_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the dispatch pipeline
    Run(RunArgs),

    /// Validate a plan file without running
    Validate(ValidateArgs),

    /// Display plan information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to plan file (TOML or JSON)
    #[arg(short, long, default_value = "relay.toml", env = "TOPIC_RELAY_CONFIG")]
    pub config: PathBuf,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "TOPIC_RELAY_TIMEOUT")]
    pub timeout: u64,

    /// Validate the plan and exit without dispatching
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "TOPIC_RELAY_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to plan file to validate
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to plan file
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the task list
    #[arg(long)]
    pub tasks: bool,
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
