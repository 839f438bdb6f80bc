//! Configuration management for vaultdex
//!
//! Handles loading, saving, and validating configuration from TOML files.

pub mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Indexing configuration
    #[serde(default)]
    pub index: IndexConfig,

    /// Extraction configuration
    #[serde(default)]
    pub extract: ExtractConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Indexing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Number of concurrent extraction workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// File extensions treated as documents
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Vault subdirectory that is never indexed
    #[serde(default = "default_trash_dir")]
    pub trash_dir: String,
}

/// Extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Line prefix delimiting the front-matter section
    #[serde(default = "default_front_matter_delimiter")]
    pub front_matter_delimiter: String,

    /// Metadata schema label under which front-matter is stored
    #[serde(default = "default_front_matter_schema")]
    pub front_matter_schema: String,

    /// Info-string prefix of labeled code blocks
    #[serde(default = "default_block_marker")]
    pub block_marker: String,

    /// Separator used to derive titles from paths
    #[serde(default = "default_title_separator")]
    pub title_separator: String,
}

/// Internal paths configuration
#[derive(Debug, Clone)]
pub struct PathsConfig {
    /// Path to config file
    pub config_file: PathBuf,

    /// Path to SQLite database
    pub db_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            config_file: Config::default_config_path(),
            db_file: default_db_file(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            extensions: default_extensions(),
            trash_dir: default_trash_dir(),
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            front_matter_delimiter: default_front_matter_delimiter(),
            front_matter_schema: default_front_matter_schema(),
            block_marker: default_block_marker(),
            title_separator: default_title_separator(),
        }
    }
}

impl Config {
    /// Get the default base directory for vaultdex (~/.vaultdex)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".vaultdex")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.paths.config_file = config_path.to_path_buf();

        config.validate()?;
        Ok(config)
    }

    /// Load the given config file, or the default one if it exists, or defaults
    pub fn load_or_default(config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load(path);
        }

        let path = Self::default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.index.workers == 0 {
            return Err(Error::Config(
                "index.workers must be a positive integer".to_string(),
            ));
        }

        if self.index.extensions.is_empty() {
            return Err(Error::Config(
                "index.extensions must list at least one extension".to_string(),
            ));
        }

        if self.extract.front_matter_delimiter.is_empty() {
            return Err(Error::Config(
                "extract.front_matter_delimiter must not be empty".to_string(),
            ));
        }

        if self.extract.front_matter_schema.is_empty() {
            return Err(Error::Config(
                "extract.front_matter_schema must not be empty".to_string(),
            ));
        }

        if self.extract.block_marker.is_empty() {
            return Err(Error::Config(
                "extract.block_marker must not be empty".to_string(),
            ));
        }

        if self.extract.title_separator.is_empty() {
            return Err(Error::Config(
                "extract.title_separator must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
