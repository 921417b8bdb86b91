//! Integration tests for the plugreg binary
//!
//! Each test builds a throwaway prefix of installed packages and a local index
//! file, then drives the CLI through environment overrides.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

const EGG_INFO_PKG_INFO: &str = concat!(
    "Metadata-Version: 1.1\n",
    "Name: local_egg_info\n",
    "Version: 2.0\n",
    "Summary: Macro for the app\n",
    "Home-page: http://localhost\n",
    "Author: Local Egg-info\n",
    "Author-email: local.egg-info@mail.com\n",
    "License: GNU General Public License v2 or later (GPLv2+)\n",
    "Description: A macro plugin for the app.\n",
    "Platform: UNKNOWN\n",
);

const DIST_INFO_METADATA: &str = concat!(
    "Metadata-Version: 2.0\n",
    "Name: local_dist_info\n",
    "Version: 1.0.0\n",
    "Summary: Macro for the app\n",
    "Home-page: http://localhost\n",
    "Author: Local Dist-info\n",
    "Author-email: local.dist-info@mail.com\n",
    "License: GNU General Public License v2 or later (GPLv2+)\n",
    "Platform: UNKNOWN\n",
    "\n",
    "A dictionary plugin for the app.\n",
);

/// A sandbox with its own prefix, index, cache and home directories
struct Sandbox {
    temp: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let sandbox = Self { temp };
        fs::create_dir_all(sandbox.prefix()).unwrap();
        fs::create_dir_all(sandbox.root().join("home")).unwrap();
        sandbox.write_index(r#"{"unrelated": []}"#);

        sandbox.install(
            "local_egg_info-2.0-py3.12.egg-info",
            "PKG-INFO",
            EGG_INFO_PKG_INFO,
            "[app.macro]\nrepeat = local_egg_info:repeat\n",
        );
        sandbox.install(
            "local_dist_info-1.0.0.dist-info",
            "METADATA",
            DIST_INFO_METADATA,
            "[app.dictionary]\nmd = local_dist_info:Dict\n",
        );
        sandbox
    }

    fn root(&self) -> &Path {
        self.temp.path()
    }

    fn prefix(&self) -> PathBuf {
        self.root().join("prefix")
    }

    fn index(&self) -> PathBuf {
        self.root().join("index.json")
    }

    fn cache(&self) -> PathBuf {
        self.root().join("cache.json")
    }

    fn install(&self, dir_name: &str, file_name: &str, metadata: &str, entry_points: &str) {
        let dir = self.prefix().join(dir_name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(file_name), metadata).unwrap();
        fs::write(dir.join("entry_points.txt"), entry_points).unwrap();
    }

    fn write_index(&self, content: &str) {
        fs::write(self.index(), content).unwrap();
    }

    fn run(&self, args: &[&str]) -> std::process::Output {
        Command::new(env!("CARGO_BIN_EXE_plugreg"))
            .current_dir(self.root())
            .env_remove("RUST_LOG")
            .env("HOME", self.root().join("home"))
            .env("XDG_CONFIG_HOME", self.root().join("config"))
            .env("XDG_DATA_HOME", self.root().join("data"))
            .env("XDG_CACHE_HOME", self.root().join("cache"))
            .env("PLUGREG_CONFIG", self.root().join("missing.yaml"))
            .env("PLUGREG_PATH", self.prefix())
            .env("PLUGREG_INDEX_URL", self.index())
            .env("PLUGREG_CACHE_FILE", self.cache())
            .args(args)
            .output()
            .expect("Failed to execute plugreg")
    }

    fn run_json(&self, args: &[&str]) -> Value {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "plugreg {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
    }
}

fn entry<'a>(list: &'a Value, name: &str) -> &'a Value {
    list.as_array()
        .unwrap()
        .iter()
        .find(|e| e["name"] == name)
        .unwrap_or_else(|| panic!("{} not listed in {}", name, list))
}

fn assert_local_only(sandbox: &Sandbox) {
    let list = sandbox.run_json(&["list", "-o", "json"]);
    assert_eq!(list.as_array().unwrap().len(), 2);

    let egg = entry(&list, "local-egg-info");
    assert_eq!(egg["installed"], "2.0");
    assert_eq!(egg["available"], serde_json::json!([]));
    assert!(egg["latest"].is_null());

    let dist = entry(&list, "local-dist-info");
    assert_eq!(dist["installed"], "1.0.0");
    assert_eq!(dist["available"], serde_json::json!([]));
    assert!(dist["latest"].is_null());

    let info = sandbox.run_json(&["info", "local_dist_info", "-o", "json"]);
    let metadata = &info["metadata"];
    assert_eq!(metadata["name"], "local_dist_info");
    assert_eq!(metadata["version"], "1.0.0");
    assert_eq!(metadata["author"], "Local Dist-info");
    assert_eq!(metadata["author_email"], "local.dist-info@mail.com");
    assert_eq!(metadata["description"], "A dictionary plugin for the app.");
    assert_eq!(metadata["home_page"], "http://localhost");
    assert_eq!(metadata["license"], "GNU General Public License v2 or later (GPLv2+)");
    assert_eq!(metadata["summary"], "Macro for the app");
    assert_eq!(metadata["keywords"], "");
}

#[test]
fn test_corrupt_cache_lists_local_plugins() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.cache(), "foobar").unwrap();
    assert_local_only(&sandbox);
}

#[test]
fn test_readonly_cache_lists_local_plugins() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.cache(), "{}").unwrap();
    fs::set_permissions(sandbox.cache(), fs::Permissions::from_mode(0o400)).unwrap();

    assert_local_only(&sandbox);
    assert_eq!(fs::read_to_string(sandbox.cache()).unwrap(), "{}");
}

#[test]
fn test_installed_version_excluded_from_available() {
    let sandbox = Sandbox::new();
    sandbox.install(
        "shared_plugin-1.0.0.dist-info",
        "METADATA",
        "Metadata-Version: 2.1\nName: shared_plugin\nVersion: 1.0.0\nSummary: Installed\n",
        "[app.extension]\nshared = shared_plugin:Ext\n",
    );
    sandbox.write_index(
        r#"{"shared-plugin": [
            {"name": "shared-plugin", "version": "1.0.0", "summary": "Installed"},
            {"name": "shared-plugin", "version": "1.1.0", "summary": "Upgrade"}
        ]}"#,
    );

    let info = sandbox.run_json(&["info", "Shared.Plugin", "-o", "json"]);
    assert_eq!(info["installed"], "1.0.0");
    assert_eq!(info["available"], serde_json::json!(["1.1.0"]));
    assert_eq!(info["latest"], "1.1.0");
    assert_eq!(info["update_available"], true);
    assert_eq!(info["metadata"]["summary"], "Installed");

    let updates = sandbox.run_json(&["list", "--updates", "-o", "json"]);
    let names: Vec<&str> = updates
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["shared-plugin"]);
}

#[test]
fn test_installed_filter_hides_remote_only() {
    let sandbox = Sandbox::new();
    sandbox.write_index(r#"{"remote-only": [{"version": "0.1"}]}"#);

    let all = sandbox.run_json(&["list", "-o", "json"]);
    assert_eq!(all.as_array().unwrap().len(), 3);
    assert!(entry(&all, "remote-only")["installed"].is_null());
    assert_eq!(entry(&all, "remote-only")["latest"], "0.1");

    let installed = sandbox.run_json(&["list", "--installed", "-o", "json"]);
    assert_eq!(installed.as_array().unwrap().len(), 2);
}

#[test]
fn test_info_unknown_plugin_fails() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["info", "does-not-exist"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("does-not-exist"));
}

#[test]
fn test_refresh_writes_cache() {
    let sandbox = Sandbox::new();
    sandbox.write_index(r#"{"remote-only": [{"version": "0.1"}]}"#);

    let report = sandbox.run_json(&["refresh", "-o", "json"]);
    assert_eq!(report["remote"]["status"], "fetched");
    assert_eq!(report["installed"], 2);
    assert_eq!(report["cataloged"], 1);
    assert_eq!(report["entries"], 3);

    let cache: Value = serde_json::from_str(&fs::read_to_string(sandbox.cache()).unwrap()).unwrap();
    assert!(cache["plugins"]["remote-only"].is_array());
}

#[test]
fn test_missing_index_reports_unavailable() {
    let sandbox = Sandbox::new();
    fs::remove_file(sandbox.index()).unwrap();

    let report = sandbox.run_json(&["refresh", "-o", "json"]);
    assert_eq!(report["remote"]["status"], "unavailable");
    assert_eq!(report["installed"], 2);
}

#[test]
fn test_completions() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["completions", "bash"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("plugreg"));
}
