//! core::config
//!
//! Configuration schema and loading.
//!
//! # Locations
//!
//! Searched in order, the first existing file wins:
//! 1. `$DOCPART_CATALOG_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/docpart-catalog/config.toml`
//! 3. `~/.docpart-catalog/config.toml`
//!
//! A missing file is not an error; defaults are used.
//!
//! # Example
//!
//! ```no_run
//! use docpart_catalog::core::config::Config;
//!
//! let loaded = Config::load(None).unwrap();
//! println!("verify after merge: {}", loaded.config.merge.verify_after_merge);
//! ```

pub mod schema;

pub use schema::{CatalogConfig, LogConfig, MergeConfig};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "DOCPART_CATALOG_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: CatalogConfig,
    /// The file it came from, if any.
    pub path: Option<PathBuf>,
}

/// Configuration loader.
pub struct Config;

impl Config {
    /// Load configuration.
    ///
    /// An `explicit` path must exist. Otherwise the standard locations are
    /// searched and defaults are used when none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed
    /// or validated.
    pub fn load(explicit: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::locate(),
        };

        let Some(path) = path else {
            return Ok(ConfigLoadResult {
                config: CatalogConfig::default(),
                path: None,
            });
        };

        let config = Self::read(&path)?;
        Ok(ConfigLoadResult {
            config,
            path: Some(path),
        })
    }

    /// Read, parse and validate one config file.
    pub fn read(path: &Path) -> Result<CatalogConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: CatalogConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// First existing file among the standard locations.
    fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("docpart-catalog/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".docpart-catalog/config.toml"))
            .filter(|path| path.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn explicit_file_is_loaded() {
        let file = write_config("[merge]\nverify_after_merge = true\nledger_capacity = 4\n");
        let loaded = Config::load(Some(file.path())).unwrap();
        assert_eq!(loaded.path.as_deref(), Some(file.path()));
        assert!(loaded.config.merge.verify_after_merge);
        assert_eq!(loaded.config.merge.ledger_capacity, 4);
    }

    #[test]
    fn missing_explicit_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let file = write_config("[merge\n");
        let err = Config::read(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn invalid_values_are_rejected_on_load() {
        let file = write_config("[log]\nlevel = \"chatty\"\n");
        let err = Config::read(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
