//! GearScout - conversational electronics research
//!
//! CLI entry point.

use std::fs;
use std::path::PathBuf;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use gearscout::cli::{CacheCommand, Cli, Command, generate_after_help};
use gearscout::config::{Config, ProviderConfigError};
use gearscout::llm::LlmError;
use gearscout::search::FileCache;
use gearscout::terminal::{TerminalIo, UserIo};
use gearscout::workflow::{Workflow, WorkflowOutcome, explain_not_converged};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Logging isn't initialized yet, so nothing here can be traced
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gearscout")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let log_file = fs::File::create(log_dir.join("gearscout.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(provider = %config.llm.provider, "GearScout loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Research { input }) => cmd_research(&config, input).await,
        Some(Command::Cache { command }) => match command {
            CacheCommand::Stats => cmd_cache_stats(&config),
            CacheCommand::Clear { expired } => cmd_cache_clear(&config, expired),
        },
        Some(Command::Config) => cmd_config(&config),
        None => cmd_research(&config, None).await,
    }
}

/// Print what the user can do about a failure anywhere in the error chain
fn report_failure(err: eyre::Report) -> eyre::Report {
    for cause in err.chain() {
        if let Some(llm) = cause.downcast_ref::<LlmError>() {
            eprintln!("{} {}", "Hint:".yellow().bold(), llm.hint());
            match llm.retry_after() {
                Some(delay) => eprintln!("Try again in {} seconds.", delay.as_secs()),
                None if llm.is_retryable() => eprintln!("This is usually temporary. Try again shortly."),
                None => {}
            }
            break;
        }
        if let Some(config) = cause.downcast_ref::<ProviderConfigError>() {
            eprintln!("{} {}", "Hint:".yellow().bold(), config.hint());
            break;
        }
    }
    err
}

/// Run an interactive research session
async fn cmd_research(config: &Config, input: Option<String>) -> Result<()> {
    debug!(has_input = input.is_some(), "cmd_research: called");
    let mut workflow = Workflow::from_config(config).map_err(report_failure)?;
    let mut io = TerminalIo::new()?;

    println!("{}", "GearScout".bright_cyan().bold());
    println!("Tell me what you want to buy. Type 'quit' at any prompt to stop.");

    let input = match input {
        Some(input) => input,
        None => io.ask("What are you looking for?")?,
    };
    if input.trim().is_empty() {
        println!("Nothing to research.");
        return Ok(());
    }

    match workflow.run(&input, &mut io).await.map_err(report_failure)? {
        WorkflowOutcome::Completed {
            requirement,
            listings,
            report,
            saved_to,
        } => {
            println!("\n{}", "Requirements".bright_cyan().bold());
            println!("{}", requirement.summary());
            println!("\n{} ({} listings)\n", "Report".bright_cyan().bold(), listings);
            println!("{}", report);
            if let Some(path) = saved_to {
                println!("\n{} {}", "Saved:".green(), path.display());
            }
        }
        WorkflowOutcome::Cancelled => {
            println!("Research cancelled.");
        }
        WorkflowOutcome::NotConverged { missing_fields, .. } => {
            println!("{}", explain_not_converged(&missing_fields));
        }
    }
    Ok(())
}

fn open_cache(config: &Config) -> Result<Option<FileCache>> {
    if !config.cache.enabled {
        println!("Cache is disabled");
        return Ok(None);
    }
    let cache = FileCache::new(&config.cache.dir, config.cache.ttl_hours, true)
        .with_context(|| format!("Failed to open cache at {}", config.cache.dir.display()))?;
    Ok(Some(cache))
}

/// Show cache statistics
fn cmd_cache_stats(config: &Config) -> Result<()> {
    debug!("cmd_cache_stats: called");
    let Some(cache) = open_cache(config)? else {
        return Ok(());
    };
    let stats = cache.stats()?;

    println!("Cache directory: {}", cache.dir().display());
    println!("Entries: {} ({} expired)", stats.entries, stats.expired);
    println!("Size: {:.1} KB", stats.total_bytes as f64 / 1024.0);
    Ok(())
}

/// Delete cache entries
fn cmd_cache_clear(config: &Config, expired_only: bool) -> Result<()> {
    debug!(expired_only, "cmd_cache_clear: called");
    let Some(cache) = open_cache(config)? else {
        return Ok(());
    };

    if expired_only {
        println!("Removed {} expired entries", cache.clear_expired()?);
    } else {
        println!("Removed {} entries", cache.clear_all()?);
    }
    Ok(())
}

/// Print the effective configuration
fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    print!("{}", serde_yaml::to_string(config).context("Failed to serialize configuration")?);
    Ok(())
}
