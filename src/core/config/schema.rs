//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Validation
//!
//! Config values are validated after parsing: the ledger must be able to
//! hold at least one event and the log level must be a known level.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::engine::ledger::DEFAULT_CAPACITY;

/// Log levels accepted in `[log] level`.
pub const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Catalog configuration.
///
/// # Example
///
/// ```toml
/// [merge]
/// verify_after_merge = true
/// ledger_capacity = 64
///
/// [log]
/// level = "debug"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// Merge settings, applied by the repository
    pub merge: MergeConfig,

    /// Logging settings, applied by the binary
    pub log: LogConfig,
}

impl CatalogConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.merge.validate()?;
        self.log.validate()
    }
}

/// Merge behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    /// Run the snapshot verifier on every merged snapshot before it can be
    /// published.
    pub verify_after_merge: bool,

    /// Merge events retained in memory.
    pub ledger_capacity: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            verify_after_merge: false,
            ledger_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl MergeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "merge.ledger_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging defaults for the binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Default level when neither `--debug` nor `RUST_LOG` is given
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LogConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.level.as_str()) {
            return Err(ConfigError::InvalidValue(format!(
                "invalid log level '{}', must be one of: {}",
                self.level,
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config: CatalogConfig = toml::from_str("").unwrap();
        assert_eq!(config, CatalogConfig::default());
        assert!(!config.merge.verify_after_merge);
        assert_eq!(config.merge.ledger_capacity, 256);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config: CatalogConfig = toml::from_str("[merge]\nverify_after_merge = true\n").unwrap();
        assert!(config.merge.verify_after_merge);
        assert_eq!(config.merge.ledger_capacity, 256);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<CatalogConfig, _> = toml::from_str("[merge]\nretries = 3\n");
        assert!(result.is_err());
    }

    #[test]
    fn zero_capacity_is_invalid() {
        let mut config = CatalogConfig::default();
        config.merge.ledger_capacity = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn unknown_log_level_is_invalid() {
        let mut config = CatalogConfig::default();
        config.log.level = "loud".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("loud"));
    }
}
