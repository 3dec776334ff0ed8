//! Configuration file handling for ptsim

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Pattern registry YAML used instead of the bundled one
    pub registry: Option<PathBuf>,
    /// Default playback preset for selftest
    pub preset: Option<String>,
    /// Default output format
    pub output: Option<String>,
    /// Disable colored output
    pub no_color: Option<bool>,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("ptsim");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(
        &self,
        registry: Option<&Path>,
        output: Option<&str>,
        no_color: bool,
    ) -> MergedConfig {
        MergedConfig {
            registry: registry
                .map(Path::to_path_buf)
                .or_else(|| self.registry.clone()),
            preset: self.preset.clone(),
            output: output
                .map(String::from)
                .or_else(|| self.output.clone())
                .unwrap_or_else(|| "table".to_string()),
            no_color: no_color || self.no_color.unwrap_or(false),
        }
    }
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub registry: Option<PathBuf>,
    pub preset: Option<String>,
    pub output: String,
    pub no_color: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_override_file() {
        let config: Config = toml::from_str(
            r#"
registry = "/etc/ptsim/patterns.yaml"
preset = "CAN"
output = "json"
"#,
        )
        .unwrap();

        let merged = config.merge_with_args(None, None, false);
        assert_eq!(merged.registry, Some(PathBuf::from("/etc/ptsim/patterns.yaml")));
        assert_eq!(merged.preset.as_deref(), Some("CAN"));
        assert_eq!(merged.output, "json");
        assert!(!merged.no_color);

        let merged = config.merge_with_args(Some(Path::new("local.yaml")), Some("table"), true);
        assert_eq!(merged.registry, Some(PathBuf::from("local.yaml")));
        assert_eq!(merged.output, "table");
        assert!(merged.no_color);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "no_color = true\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.no_color, Some(true));
        assert!(Config::load_from(&dir.path().join("missing.toml")).is_err());
    }
}
