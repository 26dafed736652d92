//! Settings
//!
//! Resolution order, lowest to highest priority:
//! 1. Built-in defaults
//! 2. TOML config file (explicit path, or `wdl-model.toml` in the working directory)
//! 3. `WDL_MODEL_*` environment variables
//! 4. Builder overrides
//!
//! There is no global settings instance; a [`Settings`] value is passed to
//! [`Project::new`](crate::project::Project::new) explicitly.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_FILE: &str = "wdl-model.toml";
const ENV_PREFIX: &str = "WDL_MODEL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Longest chain of nested imports followed before giving up
    pub max_import_depth: usize,
    /// WDL version assumed for documents that do not declare one
    pub default_version: String,
    /// Base against which relative top-level URIs are resolved
    pub base_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_import_depth: 16,
            default_version: "1.0".to_string(),
            base_dir: None,
        }
    }
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Load from `path` (or the default file, when present) and the environment
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        Self::builder().config_path(path).build()
    }

    /// Render as a config file that [`Settings::load`] reads back
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize settings")
    }
}

#[derive(Debug, Default)]
pub struct SettingsBuilder {
    config_path: Option<PathBuf>,
    max_import_depth: Option<usize>,
    base_dir: Option<PathBuf>,
}

impl SettingsBuilder {
    /// Config file path (overrides default search)
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn max_import_depth(mut self, depth: usize) -> Self {
        self.max_import_depth = Some(depth);
        self
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> Result<Settings> {
        let defaults = Settings::default();
        let mut builder = config::Config::builder()
            .set_default("max_import_depth", defaults.max_import_depth as i64)?
            .set_default("default_version", defaults.default_version)?;

        builder = match &self.config_path {
            Some(path) => builder.add_source(config::File::from(path.as_path()).required(true)),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };
        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX));

        let mut settings: Settings = builder
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Invalid settings")?;

        if let Some(depth) = self.max_import_depth {
            settings.max_import_depth = depth;
        }
        if let Some(dir) = self.base_dir {
            settings.base_dir = Some(dir);
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.max_import_depth, 16);
        assert_eq!(settings.default_version, "1.0");
        assert!(settings.base_dir.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "max_import_depth = 3").unwrap();
        writeln!(file, "default_version = \"draft-2\"").unwrap();

        let settings = Settings::load(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(settings.max_import_depth, 3);
        assert_eq!(settings.default_version, "draft-2");
    }

    #[test]
    fn test_builder_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "max_import_depth = 3").unwrap();

        let settings = Settings::builder()
            .config_path(Some(file.path().to_path_buf()))
            .max_import_depth(7)
            .base_dir("/data")
            .build()
            .unwrap();
        assert_eq!(settings.max_import_depth, 7);
        assert_eq!(settings.base_dir, Some(PathBuf::from("/data")));
    }

    #[test]
    fn test_toml_reloads() {
        let settings = Settings::builder()
            .max_import_depth(4)
            .base_dir("/data")
            .build()
            .unwrap();
        let text = settings.to_toml().unwrap();
        assert!(text.contains("max_import_depth = 4"));

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{}", text).unwrap();
        let reloaded = Settings::load(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(reloaded, settings);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let result = Settings::load(Some(PathBuf::from("/nonexistent/wdl-model.toml")));
        assert!(result.is_err());
    }
}
