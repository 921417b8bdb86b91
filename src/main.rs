use clap::Parser;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;
mod commands;

use cli::{Cli, Commands};
use plugreg::config::{Config, LogLevel};

fn setup_logging(log_level: &LogLevel, verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("plugreg")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("plugreg.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG env var takes precedence, then --verbose, then config log_level
    let mut builder = env_logger::Builder::new();
    let from_env = std::env::var("RUST_LOG").is_ok();

    let level = if verbose { log::LevelFilter::Debug } else { log_level.as_filter() };
    if from_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(level);
    }

    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    info!(
        "Log level: {} (from {})",
        level,
        if from_env {
            "RUST_LOG env"
        } else if verbose {
            "--verbose"
        } else {
            "config"
        }
    );
    Ok(())
}

fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::List {
            installed,
            updates,
            format,
        } => commands::list::run(installed, updates, cli::OutputFormat::resolve(format), &config),
        Commands::Info { name, format } => commands::info::run(&name, cli::OutputFormat::resolve(format), &config),
        Commands::Refresh { format } => commands::refresh::run(cli::OutputFormat::resolve(format), &config),
        Commands::Completions { shell } => commands::completions::run(shell),
    }
}

fn main() -> Result<()> {
    // Parse CLI arguments first
    let cli = Cli::parse();

    // Load configuration (before logging, so log messages in Config::load are silent)
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&config.log_level, cli.verbose).context("Failed to setup logging")?;

    info!("Starting plugreg with config from: {:?}", cli.config);

    run(cli, config).context("Command failed")?;

    Ok(())
}
