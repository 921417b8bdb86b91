//! Plugin discovery and version reconciliation
//!
//! Scans installed package metadata for plugins, resolves the published plugin
//! index through an on-disk cache, and merges both into a `Registry` keyed by
//! canonical plugin name.

pub mod config;
pub mod index;
pub mod metadata;
pub mod registry;
pub mod scanner;

pub use registry::{Registry, RegistryEntry, RegistryError, RegistryOptions, UpdateReport};
