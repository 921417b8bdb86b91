//! Plugin release metadata
//!
//! This module handles:
//! - The normalized `PluginMetadata` record shared by local and remote feeds
//! - The `MetadataSource` seam that heterogeneous metadata formats plug into
//! - Canonical plugin names and version ordering

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

pub mod name;
pub mod source;
pub mod version;

pub use name::canonicalize;
pub use source::{LegacyFlatMetadata, RemoteCatalogEntry, StructuredMetadata};
pub use version::Version;

/// Raw descriptive fields keyed by normalized field name (`author_email`, `home_page`, ...)
pub type FieldMap = HashMap<String, String>;

/// Fields a `PluginMetadata` is built from, in declaration order
pub const FIELD_NAMES: [&str; 10] = [
    "name",
    "version",
    "author",
    "author_email",
    "summary",
    "description",
    "description_content_type",
    "home_page",
    "keywords",
    "license",
];

/// Errors raised while extracting fields from a metadata source
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} does not declare a package name")]
    MissingName { path: PathBuf },
}

/// Anything that can yield a set of descriptive fields for one plugin release
pub trait MetadataSource {
    /// Extract the raw fields. Keys must already be normalized with `normalize_field_name`.
    fn extract_fields(&self) -> Result<FieldMap, MetadataError>;
}

/// Normalize a metadata header or JSON key (`Author-email` -> `author_email`)
pub fn normalize_field_name(key: &str) -> String {
    key.trim().to_lowercase().replace('-', "_")
}

/// Descriptive metadata of a single plugin release
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginMetadata {
    pub name: String,
    pub version: String,
    pub author: String,
    pub author_email: String,
    pub summary: String,
    pub description: String,
    pub description_content_type: String,
    pub home_page: String,
    pub keywords: String,
    pub license: String,
}

impl PluginMetadata {
    /// Build a record from a field map, substituting `""` for every absent field.
    ///
    /// Unrecognized keys are ignored; this never fails.
    pub fn from_fields(fields: &FieldMap) -> Self {
        let field = |key: &str| fields.get(key).cloned().unwrap_or_default();

        Self {
            name: field("name"),
            version: field("version"),
            author: field("author"),
            author_email: field("author_email"),
            summary: field("summary"),
            description: field("description"),
            description_content_type: field("description_content_type"),
            home_page: field("home_page"),
            keywords: field("keywords"),
            license: field("license"),
        }
    }

    /// Build a record from any metadata source
    pub fn from_source(source: &dyn MetadataSource) -> Result<Self, MetadataError> {
        Ok(Self::from_fields(&source.extract_fields()?))
    }

    pub fn builder(name: impl Into<String>, version: impl Into<String>) -> PluginMetadataBuilder {
        PluginMetadataBuilder {
            metadata: Self {
                name: name.into(),
                version: version.into(),
                ..Self::default()
            },
        }
    }

    /// Value of a field by its normalized name; `None` for names outside `FIELD_NAMES`
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "name" => &self.name,
            "version" => &self.version,
            "author" => &self.author,
            "author_email" => &self.author_email,
            "summary" => &self.summary,
            "description" => &self.description,
            "description_content_type" => &self.description_content_type,
            "home_page" => &self.home_page,
            "keywords" => &self.keywords,
            "license" => &self.license,
            _ => return None,
        };
        Some(value.as_str())
    }

    /// Non-empty fields in `FIELD_NAMES` order
    pub fn present_fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        FIELD_NAMES
            .iter()
            .filter_map(|&name| self.field(name).filter(|v| !v.is_empty()).map(|v| (name, v)))
    }

    /// Case- and separator-insensitive identifier
    pub fn canonical_name(&self) -> String {
        canonicalize(&self.name)
    }

    pub fn parsed_version(&self) -> Version {
        Version::parse(&self.version)
    }

    /// Whether the keyword list (comma or whitespace separated) contains `keyword`
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords
            .split(|c: char| c == ',' || c.is_whitespace())
            .any(|k| !k.is_empty() && k.eq_ignore_ascii_case(keyword))
    }
}

/// Fluent construction of `PluginMetadata`, mostly for tests and synthesized records
#[derive(Debug, Clone)]
pub struct PluginMetadataBuilder {
    metadata: PluginMetadata,
}

impl PluginMetadataBuilder {
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.metadata.author = author.into();
        self
    }

    pub fn author_email(mut self, email: impl Into<String>) -> Self {
        self.metadata.author_email = email.into();
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.metadata.summary = summary.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = description.into();
        self
    }

    pub fn description_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.metadata.description_content_type = content_type.into();
        self
    }

    pub fn home_page(mut self, url: impl Into<String>) -> Self {
        self.metadata.home_page = url.into();
        self
    }

    pub fn keywords(mut self, keywords: impl Into<String>) -> Self {
        self.metadata.keywords = keywords.into();
        self
    }

    pub fn license(mut self, license: impl Into<String>) -> Self {
        self.metadata.license = license.into();
        self
    }

    pub fn build(self) -> PluginMetadata {
        self.metadata
    }
}
