use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::field::{self, Field};

/// User settings for `md`.
///
/// Every setting has a default, so the file is optional and may list only
/// the keys it wants to change.
///
/// # Loading
///
/// ```rust,no_run
/// use photo_md::config::Config;
///
/// // From $MD_CONFIG or ~/.config/md/config.json
/// let config = Config::load(None).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.show_fields = vec!["title".into(), "datetime".into()];
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the working set is remembered. Defaults to `$HOME/.md`.
    pub working_set: Option<PathBuf>,
    /// Fields shown and checked when an operation names none.
    pub show_fields: Vec<String>,
    /// Bytes of padding left in embedded XMP packets for in-place edits.
    pub xmp_padding: usize,
    /// Debug logging without `-v`.
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            working_set: None,
            show_fields: field::ALL.iter().map(|f| f.name.to_string()).collect(),
            xmp_padding: 2048,
            verbose: false,
        }
    }
}

impl Config {
    /// Resolve the config file path: `$MD_CONFIG`, else
    /// `$HOME/.config/md/config.json`.
    pub fn config_path() -> Result<PathBuf> {
        if let Some(p) = std::env::var_os("MD_CONFIG") {
            return Ok(PathBuf::from(p));
        }
        let home = std::env::var_os("HOME").context("HOME is not set")?;
        Ok(PathBuf::from(home).join(".config").join("md").join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::debug!("no config file at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;
        config.default_fields()?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };
        if let Some(dir) = config_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
        }

        let contents = serde_json::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(&config_path, contents)
            .with_context(|| format!("failed to write {}", config_path.display()))?;
        log::info!("config saved to {}", config_path.display());
        Ok(config_path)
    }

    /// The working set file.
    pub fn working_set_path(&self) -> Result<PathBuf> {
        match &self.working_set {
            Some(p) => Ok(p.clone()),
            None => crate::fileset::WorkingSet::default_path(),
        }
    }

    /// `show_fields` resolved to fields.
    pub fn default_fields(&self) -> Result<Vec<&'static Field>> {
        field::parse_fields(&self.show_fields).context("invalid show_fields in config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(&dir.path().join("none.json"))).unwrap();
        assert_eq!(config.xmp_padding, 2048);
        assert_eq!(config.default_fields().unwrap().len(), 12);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"show_fields": ["t", "kw"], "working_set": "/tmp/set"}"#).unwrap();
        let config = Config::load(Some(&path)).unwrap();
        let names: Vec<&str> = config.default_fields().unwrap().iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["title", "keyword"]);
        assert_eq!(config.working_set_path().unwrap(), PathBuf::from("/tmp/set"));
        assert_eq!(config.xmp_padding, 2048);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"show_fields": ["colour"]}"#).unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn save_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("md").join("config.json");
        Config::default().save(Some(&path)).unwrap();
        assert!(Config::load(Some(&path)).is_ok());
    }
}
