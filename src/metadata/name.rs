//! Canonical plugin names

use once_cell::sync::Lazy;
use regex::Regex;

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-_.]+").unwrap());

/// Normalize a plugin name so that `Foo_Bar`, `foo.bar` and `foo--bar` all map to `foo-bar`
pub fn canonicalize(name: &str) -> String {
    SEPARATORS.replace_all(name.trim(), "-").to_lowercase()
}
