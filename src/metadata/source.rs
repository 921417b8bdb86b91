//! Metadata source formats
//!
//! - `LegacyFlatMetadata`: a `PKG-INFO` file from an `.egg-info` install
//! - `StructuredMetadata`: a `.dist-info` directory (`METADATA` plus optional `metadata.json`)
//! - `RemoteCatalogEntry`: one release object from the remote index document

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{FieldMap, MetadataError, MetadataSource, normalize_field_name};

/// Header values that packaging tools write when a field was never provided
const UNKNOWN: &str = "UNKNOWN";

/// Flat `Key: value` metadata, as found in `PKG-INFO` files
#[derive(Debug, Clone)]
pub struct LegacyFlatMetadata {
    path: PathBuf,
}

impl LegacyFlatMetadata {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MetadataSource for LegacyFlatMetadata {
    fn extract_fields(&self) -> Result<FieldMap, MetadataError> {
        let fields = parse_headers(&read_text(&self.path)?);
        require_name(fields, &self.path)
    }
}

/// A `.dist-info` directory
#[derive(Debug, Clone)]
pub struct StructuredMetadata {
    dir: PathBuf,
}

impl StructuredMetadata {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl MetadataSource for StructuredMetadata {
    fn extract_fields(&self) -> Result<FieldMap, MetadataError> {
        let metadata_path = self.dir.join("METADATA");
        let mut fields = parse_headers(&read_text(&metadata_path)?);

        let json_path = self.dir.join("metadata.json");
        if json_path.is_file() {
            match read_text(&json_path).and_then(|text| {
                serde_json::from_str::<SideMetadata>(&text).map_err(|source| MetadataError::Json {
                    path: json_path.clone(),
                    source,
                })
            }) {
                Ok(side) => side.overlay(&self.dir, &mut fields),
                Err(e) => log::debug!("Ignoring unusable {}: {}", json_path.display(), e),
            }
        }

        require_name(fields, &metadata_path)
    }
}

/// One release object of the remote catalog, keyed by the catalog entry it was listed under
#[derive(Debug, Clone, Copy)]
pub struct RemoteCatalogEntry<'a> {
    key: &'a str,
    release: &'a Map<String, Value>,
}

impl<'a> RemoteCatalogEntry<'a> {
    pub fn new(key: &'a str, release: &'a Map<String, Value>) -> Self {
        Self { key, release }
    }
}

impl MetadataSource for RemoteCatalogEntry<'_> {
    fn extract_fields(&self) -> Result<FieldMap, MetadataError> {
        let mut fields = FieldMap::new();

        for (key, value) in self.release {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(" "),
                Value::Null | Value::Object(_) => continue,
            };
            fields.insert(normalize_field_name(key), text);
        }

        if fields.get("name").is_none_or(|name| name.trim().is_empty()) {
            fields.insert("name".to_string(), self.key.to_string());
        }

        Ok(fields)
    }
}

fn read_text(path: &Path) -> Result<String, MetadataError> {
    fs::read_to_string(path).map_err(|source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn require_name(fields: FieldMap, path: &Path) -> Result<FieldMap, MetadataError> {
    match fields.get("name") {
        Some(name) if !name.trim().is_empty() => Ok(fields),
        _ => Err(MetadataError::MissingName {
            path: path.to_path_buf(),
        }),
    }
}

/// Parse RFC 822 style core metadata.
///
/// The first occurrence of a repeated header wins. A message body after the first
/// blank line is used as the description when no `Description` header was given.
pub(crate) fn parse_headers(text: &str) -> FieldMap {
    let mut fields = FieldMap::new();
    // Key currently receiving continuation lines; None when the header was a repeat
    let mut current: Option<String> = None;
    let mut lines = text.lines();

    for line in lines.by_ref() {
        if line.is_empty() {
            break;
        }

        if line.starts_with([' ', '\t']) {
            if let Some(key) = &current
                && let Some(value) = fields.get_mut(key)
            {
                value.push('\n');
                value.push_str(dedent_continuation(line));
            }
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            log::debug!("Skipping malformed metadata line: {}", line);
            current = None;
            continue;
        };

        let key = normalize_field_name(key);
        if fields.contains_key(&key) {
            current = None;
        } else {
            fields.insert(key.clone(), value.trim().to_string());
            current = Some(key);
        }
    }

    let body = lines.collect::<Vec<_>>().join("\n");
    let body = body.trim();
    if !body.is_empty() && fields.get("description").is_none_or(|d| d.trim().is_empty()) {
        fields.insert("description".to_string(), body.to_string());
    }

    for value in fields.values_mut() {
        let trimmed = value.trim_end();
        if trimmed.len() != value.len() {
            *value = trimmed.to_string();
        }
    }
    fields.retain(|_, value| *value != UNKNOWN);

    fields
}

fn dedent_continuation(line: &str) -> &str {
    line.strip_prefix("        ")
        .or_else(|| line.strip_prefix("       |"))
        .unwrap_or_else(|| line.trim_start())
}

/// Extended JSON side metadata shipped by older wheel builders
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SideMetadata {
    name: Option<String>,
    version: Option<String>,
    summary: Option<String>,
    license: Option<String>,
    keywords: Vec<String>,
    extensions: HashMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PythonDetails {
    contacts: Vec<Contact>,
    document_names: HashMap<String, String>,
    project_urls: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Contact {
    name: Option<String>,
    email: Option<String>,
    role: Option<String>,
}

impl SideMetadata {
    fn overlay(self, dir: &Path, fields: &mut FieldMap) {
        let mut set = |key: &str, value: Option<String>| {
            if let Some(value) = value.filter(|v| !v.trim().is_empty() && *v != UNKNOWN) {
                fields.insert(key.to_string(), value);
            }
        };

        set("name", self.name);
        set("version", self.version);
        set("summary", self.summary);
        set("license", self.license);
        if !self.keywords.is_empty() {
            set("keywords", Some(self.keywords.join(" ")));
        }

        let Some(details) = self
            .extensions
            .get("python.details")
            .and_then(|v| serde_json::from_value::<PythonDetails>(v.clone()).ok())
        else {
            return;
        };

        if let Some(author) = details
            .contacts
            .into_iter()
            .find(|c| c.role.as_deref().is_none_or(|role| role == "author"))
        {
            set("author", author.name);
            set("author_email", author.email);
        }

        set("home_page", details.project_urls.get("Home").cloned());

        if let Some(document) = details.document_names.get("description") {
            set("description", fs::read_to_string(dir.join(document)).ok());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PKG_INFO: &str = concat!(
        "Metadata-Version: 1.1\n",
        "Name: local_egg_info\n",
        "Version: 2.0\n",
        "Summary: Macro for the app\n",
        "Home-page: http://localhost\n",
        "Author: Local Egg-info\n",
        "Author-email: local.egg-info@mail.com\n",
        "License: GNU General Public License v2 or later (GPLv2+)\n",
        "Description: A macro plugin.\n",
        "        \n",
        "        Second paragraph.\n",
        "Keywords: UNKNOWN\n",
        "Platform: UNKNOWN\n",
    );

    const METADATA: &str = "Metadata-Version: 2.1
Name: local-dist-info
Version: 1.0.0
Summary: Dictionary for the app
Author: Local Dist-info
Author-email: local.dist-info@mail.com
Description-Content-Type: text/markdown
Classifier: One
Classifier: Two

A dictionary plugin.
";

    #[test]
    fn test_parse_headers_legacy_description() {
        let fields = parse_headers(PKG_INFO);
        assert_eq!(fields["name"], "local_egg_info");
        assert_eq!(fields["author_email"], "local.egg-info@mail.com");
        assert_eq!(fields["description"], "A macro plugin.\n\nSecond paragraph.");
        assert!(!fields.contains_key("keywords"));
        assert!(!fields.contains_key("platform"));
    }

    #[test]
    fn test_parse_headers_body_description() {
        let fields = parse_headers(METADATA);
        assert_eq!(fields["description"], "A dictionary plugin.");
        assert_eq!(fields["description_content_type"], "text/markdown");
        assert_eq!(fields["classifier"], "One");
    }

    #[test]
    fn test_parse_headers_pipe_margin() {
        let fields = parse_headers("Name: foo\nDescription: first\n       |second\n");
        assert_eq!(fields["description"], "first\nsecond");
    }

    #[test]
    fn test_parse_headers_tolerates_garbage() {
        let fields = parse_headers("this is not metadata\nName: foo\n");
        assert_eq!(fields["name"], "foo");
    }

    #[test]
    fn test_legacy_source() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("PKG-INFO");
        fs::write(&path, PKG_INFO).unwrap();

        let fields = LegacyFlatMetadata::new(&path).extract_fields().unwrap();
        assert_eq!(fields["version"], "2.0");
    }

    #[test]
    fn test_legacy_source_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = LegacyFlatMetadata::new(temp.path().join("PKG-INFO")).extract_fields();
        assert!(matches!(result, Err(MetadataError::Io { .. })));
    }

    #[test]
    fn test_legacy_source_missing_name() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("PKG-INFO");
        fs::write(&path, "Version: 1.0\n").unwrap();

        let result = LegacyFlatMetadata::new(&path).extract_fields();
        assert!(matches!(result, Err(MetadataError::MissingName { .. })));
    }

    #[test]
    fn test_structured_source_without_side_metadata() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("METADATA"), METADATA).unwrap();

        let fields = StructuredMetadata::new(temp.path()).extract_fields().unwrap();
        assert_eq!(fields["name"], "local-dist-info");
        assert!(!fields.contains_key("license"));
    }

    #[test]
    fn test_structured_source_with_side_metadata() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("METADATA"), METADATA).unwrap();
        fs::write(temp.path().join("DESCRIPTION.rst"), "Long description.").unwrap();
        fs::write(
            temp.path().join("metadata.json"),
            r#"{
                "name": "local-dist-info",
                "license": "MIT",
                "keywords": ["app_plugin", "dictionary"],
                "extensions": {
                    "python.details": {
                        "contacts": [{"name": "Someone Else", "email": "else@mail.com", "role": "author"}],
                        "document_names": {"description": "DESCRIPTION.rst"},
                        "project_urls": {"Home": "https://example.org"}
                    }
                }
            }"#,
        )
        .unwrap();

        let fields = StructuredMetadata::new(temp.path()).extract_fields().unwrap();
        assert_eq!(fields["license"], "MIT");
        assert_eq!(fields["keywords"], "app_plugin dictionary");
        assert_eq!(fields["author"], "Someone Else");
        assert_eq!(fields["home_page"], "https://example.org");
        assert_eq!(fields["description"], "Long description.");
    }

    #[test]
    fn test_structured_source_ignores_corrupt_side_metadata() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("METADATA"), METADATA).unwrap();
        fs::write(temp.path().join("metadata.json"), "{not json").unwrap();

        let fields = StructuredMetadata::new(temp.path()).extract_fields().unwrap();
        assert_eq!(fields["version"], "1.0.0");
    }

    #[test]
    fn test_remote_entry_inherits_key_as_name() {
        let release = serde_json::json!({
            "version": "1.1.0",
            "summary": "Remote",
            "author": null,
            "keywords": ["a", "b"],
            "requires_dist": {"nested": true}
        });
        let release = release.as_object().unwrap();

        let fields = RemoteCatalogEntry::new("remote-plugin", release).extract_fields().unwrap();
        assert_eq!(fields["name"], "remote-plugin");
        assert_eq!(fields["keywords"], "a b");
        assert!(!fields.contains_key("author"));
        assert!(!fields.contains_key("requires_dist"));
    }
}
