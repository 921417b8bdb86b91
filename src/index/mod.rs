//! Remote plugin index with a best-effort local cache
//!
//! Resolution runs as a chain of independent steps. Each cache step owns its failure:
//! 1. Read the cache (missing, empty, corrupt or unreadable -> cache miss)
//! 2. Use it as-is if it is fresh
//! 3. Otherwise fetch from the source (sending the cached ETag)
//! 4. Write the result back (failure is logged and discarded)
//!
//! Only a fetch failure with no cached copy to fall back on is reported to the caller.

use chrono::Utc;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub mod cache;
pub mod source;

use crate::metadata::{PluginMetadata, RemoteCatalogEntry, canonicalize};
use cache::{CacheDocument, CacheStore};
use source::{FetchError, FetchOutcome, RemoteSource};

/// Remote releases keyed by canonical name, in the order the index lists them
pub type Catalog = IndexMap<String, Vec<Arc<PluginMetadata>>>;

/// Where the catalog used for an update came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RemoteStatus {
    /// Fresh cache, no fetch needed
    CacheHit,
    /// Fetched a new catalog from the source
    Fetched,
    /// The source confirmed the cached catalog is current
    NotModified,
    /// The fetch failed; an out-of-date cached catalog was used
    Stale(String),
    /// The fetch failed and no cached catalog exists
    Unavailable(String),
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteStatus::CacheHit => write!(f, "cached"),
            RemoteStatus::Fetched => write!(f, "fetched"),
            RemoteStatus::NotModified => write!(f, "not modified"),
            RemoteStatus::Stale(reason) => write!(f, "stale ({})", reason),
            RemoteStatus::Unavailable(reason) => write!(f, "unavailable ({})", reason),
        }
    }
}

/// A resolved catalog and how it was obtained
#[derive(Debug, Clone)]
pub struct Resolved {
    pub catalog: Catalog,
    pub status: RemoteStatus,
}

impl Resolved {
    fn from_document(document: &CacheDocument, status: RemoteStatus) -> Self {
        Self {
            catalog: parse_catalog(&document.plugins),
            status,
        }
    }
}

pub struct RemoteIndex {
    source: Box<dyn RemoteSource>,
    cache: CacheStore,
    max_age: Duration,
}

impl RemoteIndex {
    pub fn new(source: Box<dyn RemoteSource>, cache: CacheStore, max_age: Duration) -> Self {
        Self {
            source,
            cache,
            max_age,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Resolve the catalog, preferring a fresh cache unless `force` is set
    pub fn resolve(&self, force: bool) -> Result<Resolved, FetchError> {
        let cached = self.read_cache();

        if !force
            && let Some(document) = &cached
            && document.is_fresh(Utc::now(), self.max_age)
        {
            log::debug!("Using cached plugin index from {}", self.cache.path().display());
            return Ok(Resolved::from_document(document, RemoteStatus::CacheHit));
        }

        match self.fetch(cached.as_ref()) {
            Ok((document, status)) => {
                self.write_cache(&document);
                Ok(Resolved::from_document(&document, status))
            }
            Err(e) => match cached {
                Some(document) => {
                    log::warn!("Plugin index fetch failed, using cached copy: {}", e);
                    Ok(Resolved::from_document(&document, RemoteStatus::Stale(e.to_string())))
                }
                None => Err(e),
            },
        }
    }

    fn read_cache(&self) -> Option<CacheDocument> {
        let origin = self.source.describe();
        match self.cache.load() {
            Ok(Some(document)) if document.matches_source(&origin) => Some(document),
            Ok(Some(_)) => {
                log::debug!("Ignoring plugin index cache: it was fetched from another source");
                None
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("Ignoring plugin index cache: {}", e);
                None
            }
        }
    }

    fn fetch(&self, cached: Option<&CacheDocument>) -> Result<(CacheDocument, RemoteStatus), FetchError> {
        let origin = self.source.describe();
        let etag = cached.and_then(|document| document.etag.as_deref());

        match self.source.fetch(etag)? {
            FetchOutcome::NotModified => {
                let mut document = cached
                    .cloned()
                    .ok_or_else(|| FetchError::MissingCachedCopy { origin: origin.clone() })?;
                document.fetched_at = Some(Utc::now());
                Ok((document, RemoteStatus::NotModified))
            }
            FetchOutcome::Modified { body, etag } => {
                let plugins = serde_json::from_str(&body).map_err(|source| FetchError::Parse {
                    origin: origin.clone(),
                    source,
                })?;
                let document = CacheDocument {
                    fetched_at: Some(Utc::now()),
                    etag,
                    source: Some(origin),
                    plugins,
                };
                Ok((document, RemoteStatus::Fetched))
            }
        }
    }

    fn write_cache(&self, document: &CacheDocument) {
        if let Err(e) = self.cache.save(document) {
            log::warn!("Could not persist plugin index cache: {}", e);
        }
    }
}

/// Turn the published index document into per-name release lists.
///
/// Entries whose value is not a list, and releases that are not objects, are skipped.
/// Names that differ only in case or separators are merged in document order.
pub fn parse_catalog(plugins: &IndexMap<String, serde_json::Value>) -> Catalog {
    let mut catalog = Catalog::new();

    for (key, value) in plugins {
        let Some(releases) = value.as_array() else {
            log::warn!("Skipping index entry '{}': expected a list of releases", key);
            continue;
        };

        for release in releases {
            let Some(release) = release.as_object() else {
                log::warn!("Skipping malformed release of '{}' in plugin index", key);
                continue;
            };

            let metadata = match PluginMetadata::from_source(&RemoteCatalogEntry::new(key, release)) {
                Ok(metadata) => metadata,
                Err(e) => {
                    log::warn!("Skipping release of '{}': {}", key, e);
                    continue;
                }
            };

            catalog
                .entry(canonicalize(key))
                .or_default()
                .push(Arc::new(metadata));
        }
    }

    catalog
}
