use colored::*;
use eyre::{Context, Result};
use serde::Serialize;

use super::{load_registry, print_remote_warning};
use crate::cli::OutputFormat;
use plugreg::config::Config;
use plugreg::metadata::{PluginMetadata, Version};
use plugreg::registry::RegistryEntry;

#[derive(Serialize)]
struct Info<'a> {
    name: &'a str,
    installed: Option<&'a str>,
    latest: Option<&'a str>,
    available: Vec<&'a str>,
    update_available: bool,
    metadata: &'a PluginMetadata,
}

impl<'a> From<&'a RegistryEntry> for Info<'a> {
    fn from(entry: &'a RegistryEntry) -> Self {
        Self {
            name: entry.name(),
            installed: entry.current().map(|c| c.version.as_str()),
            latest: entry.latest().map(|l| l.version.as_str()),
            available: entry.available().iter().map(|a| a.version.as_str()).collect(),
            update_available: entry.has_update(),
            metadata: entry.metadata(),
        }
    }
}

pub fn run(name: &str, format: OutputFormat, config: &Config) -> Result<()> {
    let (registry, report) = load_registry(config, false);

    let entry = registry
        .lookup(name)
        .context(format!("Plugin '{}' is neither installed nor in the plugin index", name))?;
    let info = Info::from(entry);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&info)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&info)?),
        OutputFormat::Text => {
            print_remote_warning(&report.remote);
            print_text(&info);
        }
    }

    Ok(())
}

fn print_text(info: &Info) {
    let status = match (info.installed, info.update_available) {
        (Some(_), true) => "update available".yellow(),
        (Some(_), false) => "installed".green(),
        (None, _) => "not installed".dimmed(),
    };
    println!("{} ({})", info.name.bold(), status);
    println!();

    for (field, value) in info.metadata.present_fields() {
        // Long descriptions are printed below the table
        if field == "description" || field == "name" {
            continue;
        }
        let label = format!("{}:", field.replace('_', " "));
        println!("  {:26} {}", label.dimmed(), value);
    }

    if let Some(installed) = info.installed {
        println!("  {:26} {}", "installed:".dimmed(), installed);
    }
    if info.available.is_empty() {
        println!("  {:26} {}", "available:".dimmed(), "(none)".dimmed());
    } else {
        let versions: Vec<String> = info
            .available
            .iter()
            .map(|v| {
                if Version::parse(v).is_prerelease() {
                    format!("{} {}", v, "(pre-release)".dimmed())
                } else {
                    v.to_string()
                }
            })
            .collect();
        println!("  {:26} {}", "available:".dimmed(), versions.join(", "));
    }

    if !info.metadata.description.is_empty() {
        println!();
        for line in info.metadata.description.lines() {
            println!("  {}", line);
        }
    }
}
