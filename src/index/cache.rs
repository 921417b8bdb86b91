//! On-disk copy of the last fetched catalog

use chrono::{DateTime, TimeDelta, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

/// Why the cache could not be used or written
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to access cache {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cache {path} is read-only")]
    ReadOnly { path: PathBuf },
}

/// Serialized cache document. Every field is optional so that `{}` is a valid (stale) cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheDocument {
    pub fetched_at: Option<DateTime<Utc>>,
    pub etag: Option<String>,
    pub source: Option<String>,
    /// The catalog as published: plugin name -> release objects
    pub plugins: IndexMap<String, serde_json::Value>,
}

impl CacheDocument {
    /// Whether the document was fetched less than `max_age` ago
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        let Some(fetched_at) = self.fetched_at else {
            return false;
        };
        let max_age = TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX);
        let age = now.signed_duration_since(fetched_at);
        age >= TimeDelta::zero() && age < max_age
    }

    /// Whether the document may be reused for catalogs served by `source`
    pub fn matches_source(&self, source: &str) -> bool {
        self.source.as_deref().is_none_or(|s| s == source)
    }
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cache. A missing or empty file is `Ok(None)`.
    pub fn load(&self) -> Result<Option<CacheDocument>, CacheError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CacheError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| CacheError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    /// Replace the cache with `document`.
    ///
    /// The document is written to a temporary file next to the cache and renamed into
    /// place, so readers in other processes see either the old or the new file.
    /// A cache file the user made read-only is left alone.
    pub fn save(&self, document: &CacheDocument) -> Result<(), CacheError> {
        let io_error = |source: std::io::Error| CacheError::Io {
            path: self.path.clone(),
            source,
        };

        if let Ok(metadata) = fs::metadata(&self.path)
            && metadata.permissions().readonly()
        {
            return Err(CacheError::ReadOnly {
                path: self.path.clone(),
            });
        }

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(io_error)?;

        let encoded = serde_json::to_string_pretty(document).map_err(|source| CacheError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(io_error)?;
        tmp.write_all(encoded.as_bytes()).map_err(io_error)?;
        tmp.flush().map_err(io_error)?;
        tmp.persist(&self.path).map_err(|e| io_error(e.error))?;

        log::debug!("Wrote plugin index cache to {}", self.path.display());
        Ok(())
    }
}
