//! List command
//!
//! Shows installed plugins alongside the releases published for them.

use colored::*;
use eyre::Result;

use super::{EntrySummary, get_terminal_width, load_registry, print_remote_warning, truncate};
use crate::cli::OutputFormat;
use plugreg::config::Config;
use plugreg::registry::RegistryEntry;

pub fn run(installed: bool, updates: bool, format: OutputFormat, config: &Config) -> Result<()> {
    let (registry, report) = load_registry(config, false);

    let entries: Vec<&RegistryEntry> = if updates {
        registry.updatable().collect()
    } else {
        registry.iter().filter(|entry| !installed || entry.is_installed()).collect()
    };

    match format {
        OutputFormat::Json => {
            let summaries: Vec<EntrySummary> = entries.iter().copied().map(EntrySummary::from).collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        OutputFormat::Yaml => {
            let summaries: Vec<EntrySummary> = entries.iter().copied().map(EntrySummary::from).collect();
            println!("{}", serde_yaml::to_string(&summaries)?);
        }
        OutputFormat::Text => {
            print_remote_warning(&report.remote);
            print_text(&entries, updates);
        }
    }

    Ok(())
}

fn print_text(entries: &[&RegistryEntry], updates: bool) {
    let heading = if updates { "Plugin updates" } else { "Plugins" };
    println!(
        "{} ({}):",
        heading.cyan(),
        format!("{} shown", entries.len()).dimmed()
    );

    if entries.is_empty() {
        println!("  {}", "(none)".dimmed());
        return;
    }

    let name_width = entries.iter().map(|e| e.name().chars().count()).max().unwrap_or(4);
    let version_width = entries
        .iter()
        .map(|e| version_column(e).chars().count())
        .max()
        .unwrap_or(7);

    // "  ✓ " + name + " " + version + " "
    let used = 4 + name_width + 1 + version_width + 1;
    let summary_width = get_terminal_width().saturating_sub(used);

    for entry in entries {
        let marker = if entry.has_update() {
            "↑".yellow()
        } else if entry.is_installed() {
            "✓".green()
        } else {
            "○".dimmed()
        };
        let name = format!("{:width$}", entry.name(), width = name_width);
        let name = if entry.is_installed() { name.green() } else { name.normal() };
        let version = format!("{:width$}", version_column(entry), width = version_width);

        println!(
            "  {} {} {} {}",
            marker,
            name,
            version.dimmed(),
            truncate(&entry.metadata().summary, summary_width)
        );
    }
}

/// `1.0.0`, `1.0.0 → 1.1.0` or `(1.1.0)` for plugins that are not installed
fn version_column(entry: &RegistryEntry) -> String {
    match (entry.current(), entry.latest()) {
        (Some(current), Some(latest)) if entry.has_update() => format!("{} → {}", current.version, latest.version),
        (Some(current), _) => current.version.clone(),
        (None, Some(latest)) => format!("({})", latest.version),
        (None, None) => String::new(),
    }
}
