//! Installed package metadata directories

use lazy_regex::regex_captures;
use std::fs;
use std::path::{Path, PathBuf};

use crate::metadata::{
    LegacyFlatMetadata, MetadataError, MetadataSource, PluginMetadata, StructuredMetadata,
};

/// On-disk metadata layout of an installed package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `<name>-<version>.egg-info/` directory holding `PKG-INFO`
    EggInfoDir,
    /// `<name>-<version>.egg-info` file that is itself the `PKG-INFO`
    EggInfoFile,
    /// `<name>-<version>.dist-info/` directory holding `METADATA`
    DistInfo,
}

/// A package metadata entry found on the search path
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    pub path: PathBuf,
    pub layout: Layout,
}

impl InstalledPackage {
    /// Recognize a search-path entry as package metadata
    pub fn detect(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?;

        let layout = if file_name.ends_with(".dist-info") && path.is_dir() {
            Layout::DistInfo
        } else if file_name.ends_with(".egg-info") {
            if path.is_dir() {
                Layout::EggInfoDir
            } else {
                Layout::EggInfoFile
            }
        } else {
            return None;
        };

        Some(Self {
            path: path.to_path_buf(),
            layout,
        })
    }

    fn source(&self) -> Box<dyn MetadataSource> {
        match self.layout {
            Layout::EggInfoDir => Box::new(LegacyFlatMetadata::new(self.path.join("PKG-INFO"))),
            Layout::EggInfoFile => Box::new(LegacyFlatMetadata::new(&self.path)),
            Layout::DistInfo => Box::new(StructuredMetadata::new(&self.path)),
        }
    }

    /// Read the package's descriptive fields
    pub fn metadata(&self) -> Result<PluginMetadata, MetadataError> {
        PluginMetadata::from_source(self.source().as_ref())
    }

    /// Minimal record derived from the directory name, for packages whose metadata is unusable
    pub fn fallback_metadata(&self) -> PluginMetadata {
        let (name, version) = parse_dir_name(&self.path);
        PluginMetadata::builder(name, version).build()
    }

    /// Entry point groups declared by the package (empty when it declares none)
    pub fn entry_point_groups(&self) -> Vec<String> {
        if self.layout == Layout::EggInfoFile {
            return Vec::new();
        }

        let path = self.path.join("entry_points.txt");
        match fs::read_to_string(&path) {
            Ok(content) => parse_entry_point_groups(&content),
            Err(e) => {
                if path.exists() {
                    log::debug!("Cannot read {}: {}", path.display(), e);
                }
                Vec::new()
            }
        }
    }
}

/// Split `foo_bar-1.0-py3.12.egg-info` into (`foo_bar`, `1.0`)
fn parse_dir_name(path: &Path) -> (String, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    if let Some((_, name, version)) = regex_captures!(r"^([^-]+)-([^-]+)(?:-.*)?$", stem.as_str()) {
        return (name.to_string(), version.to_string());
    }
    (stem, String::new())
}

/// Section headers of an INI-style `entry_points.txt`
fn parse_entry_point_groups(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            line.strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
                .map(|group| group.trim().to_string())
        })
        .filter(|group| !group.is_empty())
        .collect()
}
