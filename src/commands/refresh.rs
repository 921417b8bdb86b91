use colored::*;
use eyre::Result;

use super::load_registry;
use crate::cli::OutputFormat;
use plugreg::config::Config;
use plugreg::index::RemoteStatus;
use plugreg::registry::UpdateReport;

pub fn run(format: OutputFormat, config: &Config) -> Result<()> {
    if format == OutputFormat::Text {
        println!("{} Refreshing plugin index: {}", "→".blue(), config.index.url.cyan());
    }
    let (_, report) = load_registry(config, true);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&report)?),
        OutputFormat::Text => print_text(&report),
    }

    Ok(())
}

fn print_text(report: &UpdateReport) {
    let badge = match report.remote {
        RemoteStatus::Fetched | RemoteStatus::NotModified | RemoteStatus::CacheHit => "✓".green(),
        RemoteStatus::Stale(_) => "⚠".yellow(),
        RemoteStatus::Unavailable(_) => "✗".red(),
    };
    println!("  {} Plugin index {}", badge, report.remote);
    println!("  {:14} {}", "Installed:".dimmed(), report.installed);
    println!("  {:14} {}", "In index:".dimmed(), report.cataloged);
    println!("  {:14} {}", "Total:".dimmed(), report.entries);
}
