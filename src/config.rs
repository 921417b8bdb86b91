use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main plugreg configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: LogLevel,
    pub paths: PathsConfig,
    pub index: IndexConfig,
    pub discovery: DiscoveryConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directories holding installed package metadata, most specific first
    pub search_path: Vec<PathBuf>,
    /// Where the last fetched plugin index is kept
    pub cache_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IndexConfig {
    /// URL or local path of the plugin index document
    pub url: String,
    /// Network timeout for fetching the index
    pub timeout_secs: u64,
    /// How long a cached index is trusted before fetching again
    pub max_age_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Entry point group prefix that marks a package as a plugin
    pub entry_point_prefix: String,
    /// Keyword that marks a package as a plugin
    pub plugin_keyword: String,
    /// Packages never listed as plugins
    pub ignore: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            paths: PathsConfig::default(),
            index: IndexConfig::default(),
            discovery: DiscoveryConfig::default(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")).join("plugreg");
        let cache_dir = dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".")).join("plugreg");

        Self {
            search_path: vec![data_dir.join("plugins")],
            cache_file: cache_dir.join("index.json"),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: "https://raw.githubusercontent.com/plugreg/index/main/index.json".to_string(),
            timeout_secs: 10,
            max_age_secs: 60 * 60,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            entry_point_prefix: "app.".to_string(),
            plugin_keyword: "app_plugin".to_string(),
            ignore: vec!["app".to_string(), "plugreg".to_string()],
        }
    }
}

impl Config {
    /// Load configuration with fallback chain, then apply environment overrides
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file(config_path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_file(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Check PLUGREG_CONFIG env var
        if let Ok(env_path) = std::env::var("PLUGREG_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from PLUGREG_CONFIG: {}", e);
                    }
                }
            }
        }

        // Try ~/.config/plugreg/plugreg.yaml
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("plugreg").join("plugreg.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }

        // Try ./plugreg.yaml (for development)
        let local_config = PathBuf::from("plugreg.yaml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load local config: {}", e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply `PLUGREG_INDEX_URL`, `PLUGREG_CACHE_FILE` and `PLUGREG_PATH`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var_os(key));
    }

    fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<std::ffi::OsString>,
    {
        if let Some(url) = var("PLUGREG_INDEX_URL").and_then(|v| v.into_string().ok()) {
            self.index.url = url;
        }
        if let Some(cache_file) = var("PLUGREG_CACHE_FILE") {
            self.paths.cache_file = PathBuf::from(cache_file);
        }
        if let Some(search_path) = var("PLUGREG_PATH") {
            self.paths.search_path = std::env::split_paths(&search_path).collect();
        }
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::ffi::OsString;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.discovery.entry_point_prefix, "app.");
        assert!(config.discovery.ignore.contains(&"plugreg".to_string()));
        assert_eq!(config.index.timeout_secs, 10);
        assert!(config.paths.cache_file.ends_with("index.json"));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str(
            r#"
log_level: debug
index:
  url: /srv/plugins/index.json
"#,
        )
        .unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.index.url, "/srv/plugins/index.json");
        assert_eq!(config.index.max_age_secs, 3600);
        assert_eq!(config.discovery.plugin_keyword, "app_plugin");
    }

    #[test]
    fn test_apply_overrides() {
        let vars: HashMap<&str, OsString> = HashMap::from([
            ("PLUGREG_INDEX_URL", OsString::from("test/index.json")),
            ("PLUGREG_CACHE_FILE", OsString::from("/tmp/cache.json")),
            ("PLUGREG_PATH", OsString::from("/a:/b")),
        ]);

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).cloned());

        assert_eq!(config.index.url, "test/index.json");
        assert_eq!(config.paths.cache_file, PathBuf::from("/tmp/cache.json"));
        assert_eq!(config.paths.search_path, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let mut config = Config::default();
        let before = config.index.url.clone();
        config.apply_overrides(|_| None);
        assert_eq!(config.index.url, before);
    }

    #[test]
    fn test_log_level_filter() {
        assert_eq!(LogLevel::Warn.as_filter(), log::LevelFilter::Warn);
        assert_eq!(LogLevel::Off.as_filter(), log::LevelFilter::Off);
    }

    #[test]
    fn test_expand_path_no_expansion() {
        let path = PathBuf::from("/usr/local/lib");
        let expanded = Config::expand_path(&path);
        assert_eq!(expanded, PathBuf::from("/usr/local/lib"));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/plugins");
        let expanded = Config::expand_path(&path);
        assert!(!expanded.to_string_lossy().contains('~'));
        assert!(expanded.to_string_lossy().contains("plugins"));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let yaml_str = serde_yaml::to_string(&config).expect("Failed to serialize");
        let parsed: Config = serde_yaml::from_str(&yaml_str).expect("Failed to deserialize");
        assert_eq!(parsed.index.url, config.index.url);
        assert_eq!(parsed.paths.search_path, config.paths.search_path);
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let result = Config::load(Some(&PathBuf::from("/nonexistent/plugreg.yaml")));
        assert!(result.is_err());
    }
}
