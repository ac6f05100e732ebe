//! Migration settings loaded from TOML.
//!
//! Every key is optional; an absent file or section yields the built-in
//! defaults, which reproduce Komga's conventional layout.
//!
//! # Configuration File Format
//!
//! ```toml
//! [naming]
//! max_length = 100
//! unknown_author = "Unknown Author"
//!
//! [library]
//! catalog_file = "metadata.db"
//! ```

use crate::catalog::UNKNOWN_AUTHOR;
use crate::sanitize::{MAX_NAME_LENGTH, sanitize_with_limit};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = ".calibre2komga.toml";

/// Default name of the Calibre catalog inside the library root.
pub const DEFAULT_CATALOG_FILE: &str = "metadata.db";

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Invalid TOML syntax, unknown structure or out-of-range values.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// IO error while reading configuration.
    #[error("IO error reading configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level migration configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    #[serde(default)]
    pub naming: NamingConfig,

    #[serde(default)]
    pub library: LibraryConfig,
}

/// Rules for generated folder and file names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamingConfig {
    /// Maximum length of a generated name in characters, excluding the
    /// file extension.
    pub max_length: usize,

    /// Author used for books without a linked author.
    pub unknown_author: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            max_length: MAX_NAME_LENGTH,
            unknown_author: UNKNOWN_AUTHOR.to_string(),
        }
    }
}

/// Layout of the source Calibre library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LibraryConfig {
    /// Catalog file name relative to the library root.
    pub catalog_file: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            catalog_file: DEFAULT_CATALOG_FILE.to_string(),
        }
    }
}

impl MigrationConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.calibre2komga.toml` in the current directory
    /// 3. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly provided file is missing, or if any
    /// file found cannot be read, parsed or validated.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.is_file() {
            return Self::load_from_file(&local_config);
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that the TOML types alone cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.naming.max_length == 0 {
            return Err(ConfigError::Invalid(
                "naming.max_length must be at least 1".to_string(),
            ));
        }
        if self.naming.unknown_author.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "naming.unknown_author must not be empty".to_string(),
            ));
        }
        // Doubles as the folder name for authors that sanitize to nothing
        if sanitize_with_limit(&self.naming.unknown_author, self.naming.max_length).is_empty() {
            return Err(ConfigError::Invalid(format!(
                "naming.unknown_author {:?} is not usable as a folder name",
                self.naming.unknown_author
            )));
        }
        if self.library.catalog_file.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "library.catalog_file must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
