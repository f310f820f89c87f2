//! Configuration loading and validation

use anyhow::Result;
use pencompat_core::{FormatOptions, ViewMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Bind address for web server
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Directory of static files served as fallback (the browser page)
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            static_dir: default_static_dir(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_static_dir() -> String {
    "./web".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Dataset sources in load order: file paths or http(s) URLs
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
    /// Timeout for fetching a remote source
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

fn default_sources() -> Vec<String> {
    vec!["./compat.xml".to_string()]
}

fn default_fetch_timeout() -> u64 {
    30
}

/// Initial display switches; the API and CLI can override each per request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default)]
    pub view: ViewMode,
    #[serde(default = "default_true")]
    pub show_names: bool,
    #[serde(default = "default_true")]
    pub one_per_line: bool,
    #[serde(default)]
    pub organize_by_family: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            view: ViewMode::default(),
            show_names: true,
            one_per_line: true,
            organize_by_family: false,
        }
    }
}

fn default_true() -> bool {
    true
}

impl DisplayConfig {
    pub fn format_options(&self) -> FormatOptions {
        FormatOptions {
            show_names: self.show_names,
            one_per_line: self.one_per_line,
            organize_by_family: self.organize_by_family,
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.daemon.bind, "127.0.0.1:8080");
        assert_eq!(config.dataset.sources, vec!["./compat.xml".to_string()]);
        assert_eq!(config.display.view, ViewMode::Grouped);
        assert!(config.display.show_names);
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pencompat.toml");
        std::fs::write(
            &path,
            r#"
[dataset]
sources = ["base.xml", "https://example.org/extra.xml"]

[display]
view = "by-pen"
organize_by_family = true
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.dataset.sources.len(), 2);
        assert_eq!(config.dataset.fetch_timeout_secs, 30);
        assert_eq!(config.display.view, ViewMode::ByPen);
        assert!(config.display.one_per_line);

        let options = config.display.format_options();
        assert!(options.organize_by_family);
        assert!(options.show_names);
    }

    #[test]
    fn test_save_default_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pencompat.toml");
        save_default_config(&path).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.daemon.static_dir, "./web");
        assert_eq!(config.display.view, ViewMode::Grouped);
    }

    #[test]
    fn test_invalid_view_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pencompat.toml");
        std::fs::write(&path, "[display]\nview = \"sideways\"\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
