//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// GearScout - conversational electronics research
#[derive(Parser)]
#[command(
    name = "gs",
    about = "Talk through what you want to buy, then get a researched comparison report",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute (defaults to research)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Research a product purchase (default)
    Research {
        /// What you are looking for; prompted for when omitted
        input: Option<String>,
    },

    /// Manage the search result cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },

    /// Print the effective configuration as YAML
    Config,
}

/// Cache management subcommands
#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Show entry count and size
    Stats,

    /// Delete cached search results
    Clear {
        /// Only delete expired entries
        #[arg(long)]
        expired: bool,
    },
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gearscout")
        .join("logs")
        .join("gearscout.log");
    debug!(?path, "get_log_path: returning path");
    path
}

/// Help footer pointing at the log file
pub fn generate_after_help() -> String {
    format!("Logs are written to: {}\n", get_log_path().display())
}
