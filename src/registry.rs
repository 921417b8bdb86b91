//! Plugin registry
//!
//! Merges installed plugins with the remote catalog into one entry per canonical name.
//! The registry is empty until `update()` is called; reads never scan or fetch.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Index;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::index::cache::CacheStore;
use crate::index::source::source_from_location;
use crate::index::{Catalog, RemoteIndex, RemoteStatus};
use crate::metadata::{PluginMetadata, canonicalize};
use crate::scanner::{InstalledPlugins, ScanOptions, Scanner};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no plugin named '{name}'")]
    NotFound { name: String },
}

/// Everything needed to build a registry, resolved from configuration up front
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    pub scan: ScanOptions,
    pub index_url: String,
    pub cache_file: PathBuf,
    pub timeout: Duration,
    pub max_age: Duration,
}

impl RegistryOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scan: ScanOptions {
                search_path: config
                    .paths
                    .search_path
                    .iter()
                    .map(|p| Config::expand_path(p))
                    .collect(),
                entry_point_prefix: config.discovery.entry_point_prefix.clone(),
                plugin_keyword: config.discovery.plugin_keyword.clone(),
                ignore: config.discovery.ignore.clone(),
            },
            index_url: config.index.url.clone(),
            cache_file: Config::expand_path(&config.paths.cache_file),
            timeout: Duration::from_secs(config.index.timeout_secs),
            max_age: Duration::from_secs(config.index.max_age_secs),
        }
    }
}

/// Merged view of one plugin
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    name: String,
    current: Option<Arc<PluginMetadata>>,
    available: Vec<Arc<PluginMetadata>>,
    metadata: Arc<PluginMetadata>,
}

impl RegistryEntry {
    /// Merge the installed record (if any) with the remote releases for one name.
    ///
    /// Returns `None` when there is nothing to describe.
    fn build(name: &str, current: Option<Arc<PluginMetadata>>, releases: &[Arc<PluginMetadata>]) -> Option<Self> {
        let installed = current.as_ref().map(|c| c.parsed_version());

        let mut available = Vec::with_capacity(releases.len());
        for release in releases {
            let version = release.parsed_version();
            if installed.as_ref() == Some(&version) {
                continue;
            }
            if available.iter().any(|(seen, _)| *seen == version) {
                log::debug!("Ignoring duplicate release {} {} in plugin index", name, version);
                continue;
            }
            available.push((version, Arc::clone(release)));
        }
        // Stable, so equal versions keep their published order
        available.sort_by(|(a, _), (b, _)| a.cmp(b));
        let available: Vec<_> = available.into_iter().map(|(_, release)| release).collect();

        let metadata = match &current {
            Some(current) => Arc::clone(current),
            None => Arc::clone(available.last()?),
        };

        Some(Self {
            name: name.to_string(),
            current,
            available,
            metadata,
        })
    }

    /// Canonical plugin name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The installed release
    pub fn current(&self) -> Option<&Arc<PluginMetadata>> {
        self.current.as_ref()
    }

    /// Remote releases other than the installed one, oldest first
    pub fn available(&self) -> &[Arc<PluginMetadata>] {
        &self.available
    }

    /// Newest available release
    pub fn latest(&self) -> Option<&Arc<PluginMetadata>> {
        self.available.last()
    }

    /// The record to show a user: the installed release if any, else the latest
    pub fn metadata(&self) -> &Arc<PluginMetadata> {
        &self.metadata
    }

    pub fn is_installed(&self) -> bool {
        self.current.is_some()
    }

    /// Installed, and a newer release is available
    pub fn has_update(&self) -> bool {
        match (&self.current, self.latest()) {
            (Some(current), Some(latest)) => latest.parsed_version() > current.parsed_version(),
            _ => false,
        }
    }
}

/// Summary of one `update()` run
#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    pub installed: usize,
    pub cataloged: usize,
    pub entries: usize,
    pub remote: RemoteStatus,
}

/// Installed and published plugins, keyed by canonical name.
///
/// `update()` takes `&mut self`; callers sharing a registry between threads must
/// serialize updates themselves.
pub struct Registry {
    scanner: Scanner,
    index: RemoteIndex,
    entries: BTreeMap<String, RegistryEntry>,
    populated: bool,
}

impl Registry {
    pub fn new(options: RegistryOptions) -> Self {
        let source = source_from_location(&options.index_url, options.timeout);
        let index = RemoteIndex::new(source, CacheStore::new(options.cache_file), options.max_age);
        Self::with_parts(Scanner::new(options.scan), index)
    }

    pub fn with_parts(scanner: Scanner, index: RemoteIndex) -> Self {
        Self {
            scanner,
            index,
            entries: BTreeMap::new(),
            populated: false,
        }
    }

    /// Rescan installed plugins, resolve the remote catalog and rebuild every entry.
    ///
    /// Cache and fetch problems are recorded in the report, never returned as errors.
    pub fn update(&mut self) -> UpdateReport {
        self.run(false)
    }

    /// Like `update()`, but always asks the remote source instead of trusting a fresh cache
    pub fn refresh(&mut self) -> UpdateReport {
        self.run(true)
    }

    fn run(&mut self, force: bool) -> UpdateReport {
        let scanner = &self.scanner;
        let index = &self.index;

        let (local, resolved) = thread::scope(|s| {
            let remote = s.spawn(move || index.resolve(force));
            let local = scanner.scan();
            let resolved = remote.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic));
            (local, resolved)
        });

        let (catalog, remote) = match resolved {
            Ok(resolved) => (resolved.catalog, resolved.status),
            Err(e) => {
                log::warn!("Plugin index unavailable, showing installed plugins only: {}", e);
                (Catalog::new(), RemoteStatus::Unavailable(e.to_string()))
            }
        };

        let entries = merge(&local, &catalog);
        let report = UpdateReport {
            installed: local.len(),
            cataloged: catalog.len(),
            entries: entries.len(),
            remote,
        };

        self.entries = entries;
        self.populated = true;

        log::info!(
            "Registry updated: {} entries ({} installed, {} in index, index {})",
            report.entries,
            report.installed,
            report.cataloged,
            report.remote
        );
        report
    }

    /// Whether `update()` has run at least once
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&canonicalize(name))
    }

    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.get(&canonicalize(name))
    }

    /// Look up a plugin by any spelling of its name
    pub fn lookup(&self, name: &str) -> Result<&RegistryEntry, RegistryError> {
        self.get(name).ok_or_else(|| RegistryError::NotFound {
            name: name.to_string(),
        })
    }

    /// Canonical names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    /// Installed plugins with a newer release available
    pub fn updatable(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.iter().filter(|entry| entry.has_update())
    }
}

impl Index<&str> for Registry {
    type Output = RegistryEntry;

    /// # Panics
    ///
    /// Panics if no plugin has this name; use `get` or `lookup` to handle that case.
    fn index(&self, name: &str) -> &RegistryEntry {
        match self.get(name) {
            Some(entry) => entry,
            None => panic!("no plugin named '{}' in registry", name),
        }
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a RegistryEntry;
    type IntoIter = std::collections::btree_map::Values<'a, String, RegistryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

fn merge(local: &InstalledPlugins, catalog: &Catalog) -> BTreeMap<String, RegistryEntry> {
    let names: BTreeSet<&String> = local.keys().chain(catalog.keys()).collect();

    names
        .into_iter()
        .filter_map(|name| {
            let current = local.get(name).cloned();
            let releases = catalog.get(name).map(Vec::as_slice).unwrap_or_default();
            RegistryEntry::build(name, current, releases).map(|entry| (name.clone(), entry))
        })
        .collect()
}
