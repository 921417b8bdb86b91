//! Local installation scanning
//!
//! Walks each directory of the search path for installed package metadata
//! (`.egg-info` and `.dist-info`) and keeps the packages that identify as plugins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

pub mod package;

use crate::metadata::{PluginMetadata, canonicalize};
use package::InstalledPackage;

/// How to find and recognize installed plugins
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Directories to scan, most specific first
    pub search_path: Vec<PathBuf>,
    /// Packages declaring an entry point group with this prefix are plugins
    pub entry_point_prefix: String,
    /// Packages listing this keyword are plugins
    pub plugin_keyword: String,
    /// Package names never reported (the host application, the manager itself)
    pub ignore: Vec<String>,
}

/// Installed plugins, keyed by canonical name
pub type InstalledPlugins = BTreeMap<String, Arc<PluginMetadata>>;

#[derive(Debug, Clone)]
pub struct Scanner {
    options: ScanOptions,
    ignore: Vec<String>,
}

impl Scanner {
    pub fn new(options: ScanOptions) -> Self {
        let ignore = options.ignore.iter().map(|name| canonicalize(name)).collect();
        Self { options, ignore }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Scan the search path. The first entry found for a canonical name wins.
    pub fn scan(&self) -> InstalledPlugins {
        let mut found = InstalledPlugins::new();

        for dir in &self.options.search_path {
            for package in list_packages(dir) {
                let Some(metadata) = self.inspect(&package) else {
                    continue;
                };

                let name = metadata.canonical_name();
                if let Some(existing) = found.get(&name) {
                    log::debug!(
                        "Ignoring {} {} at {}: already found {}",
                        name,
                        metadata.version,
                        package.path.display(),
                        existing.version
                    );
                    continue;
                }

                log::debug!("Found plugin {} {} at {}", name, metadata.version, package.path.display());
                found.insert(name, Arc::new(metadata));
            }
        }

        log::info!("Found {} installed plugin(s)", found.len());
        found
    }

    /// Load a package's metadata and return it if the package is a plugin
    fn inspect(&self, package: &InstalledPackage) -> Option<PluginMetadata> {
        let metadata = package.metadata().unwrap_or_else(|e| {
            log::warn!("Unusable metadata in {}: {}", package.path.display(), e);
            package.fallback_metadata()
        });

        if metadata.name.is_empty() {
            return None;
        }

        if self.ignore.contains(&metadata.canonical_name()) {
            return None;
        }

        if !self.is_plugin(package, &metadata) {
            return None;
        }

        Some(metadata)
    }

    fn is_plugin(&self, package: &InstalledPackage, metadata: &PluginMetadata) -> bool {
        let prefix = &self.options.entry_point_prefix;
        if !prefix.is_empty()
            && package
                .entry_point_groups()
                .iter()
                .any(|group| group.starts_with(prefix.as_str()))
        {
            return true;
        }

        !self.options.plugin_keyword.is_empty() && metadata.has_keyword(&self.options.plugin_keyword)
    }
}

/// Package metadata entries directly inside `dir`, in file name order
fn list_packages(dir: &Path) -> Vec<InstalledPackage> {
    if !dir.is_dir() {
        log::debug!("Skipping search path entry {}: not a directory", dir.display());
        return Vec::new();
    }

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                log::debug!("Error walking directory: {}", e);
                None
            }
        })
        .filter_map(|entry| InstalledPackage::detect(entry.path()))
        .collect()
}
