//! CLI command implementations

use colored::*;
use serde::Serialize;
use terminal_size::{Width, terminal_size};

use plugreg::config::Config;
use plugreg::index::RemoteStatus;
use plugreg::registry::{Registry, RegistryEntry, RegistryOptions, UpdateReport};

pub mod completions;
pub mod info;
pub mod list;
pub mod refresh;

/// Build a registry from configuration and populate it
pub(crate) fn load_registry(config: &Config, force: bool) -> (Registry, UpdateReport) {
    let mut registry = Registry::new(RegistryOptions::from_config(config));
    let report = if force { registry.refresh() } else { registry.update() };
    (registry, report)
}

/// Machine-readable summary of one registry entry
#[derive(Debug, Serialize)]
pub(crate) struct EntrySummary {
    pub name: String,
    pub installed: Option<String>,
    pub latest: Option<String>,
    pub available: Vec<String>,
    pub update_available: bool,
    pub summary: String,
}

impl From<&RegistryEntry> for EntrySummary {
    fn from(entry: &RegistryEntry) -> Self {
        Self {
            name: entry.name().to_string(),
            installed: entry.current().map(|c| c.version.clone()),
            latest: entry.latest().map(|l| l.version.clone()),
            available: entry.available().iter().map(|a| a.version.clone()).collect(),
            update_available: entry.has_update(),
            summary: entry.metadata().summary.clone(),
        }
    }
}

/// Get terminal width, defaulting to 80 if not available
pub(crate) fn get_terminal_width() -> usize {
    terminal_size().map(|(Width(w), _)| w as usize).unwrap_or(80)
}

/// Truncate to `max_chars` characters, marking the cut with an ellipsis
pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(max_chars - 1).collect();
    out.push('…');
    out
}

/// Warn on stderr when the listing is missing remote data
pub(crate) fn print_remote_warning(status: &RemoteStatus) {
    match status {
        RemoteStatus::Stale(_) => {
            eprintln!("{} Plugin index is out of date: {}", "⚠".yellow(), status);
        }
        RemoteStatus::Unavailable(_) => {
            eprintln!("{} Plugin index {}; showing installed plugins only", "⚠".yellow(), status);
        }
        _ => {}
    }
}
