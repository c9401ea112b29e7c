//! Monitor configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! print_task_tree = true
//! log_overwrite_if_exists = false
//! log_filename = "./logs.json"
//! log_level = "tmon_tree=debug,info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Default log destination
pub const DEFAULT_LOG_FILENAME: &str = "./logs.json";

/// Monitor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    /// Log the rendered task tree after every change
    pub print_task_tree: bool,

    /// Truncate an existing log file instead of refusing to start
    pub log_overwrite_if_exists: bool,

    /// JSON log destination; empty logs to stderr instead
    pub log_filename: String,

    /// `EnvFilter` directive, overridden by `RUST_LOG`
    pub log_level: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            print_task_tree: true,
            log_overwrite_if_exists: true,
            log_filename: DEFAULT_LOG_FILENAME.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl MonitorConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys,
    /// or any error from [`MonitorConfig::validate`]
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if the file can't be read, otherwise as
    /// [`MonitorConfig::from_toml_str`]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Check the configuration against the environment
    ///
    /// # Errors
    /// - [`ConfigError::LogFileExists`] if the log file exists and
    ///   overwriting is disabled
    /// - [`ConfigError::InvalidLogLevel`] if `log_level` is not a valid filter
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = self.log_path() {
            if path.exists() && !self.log_overwrite_if_exists {
                return Err(ConfigError::LogFileExists {
                    path: path.to_path_buf(),
                });
            }
        }
        EnvFilter::try_new(&self.log_level).map_err(|e| ConfigError::InvalidLogLevel {
            level: self.log_level.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    /// Log file path, `None` when file logging is disabled
    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        (!self.log_filename.is_empty()).then(|| Path::new(&self.log_filename))
    }

    /// Same configuration logging to stderr only
    #[must_use]
    pub fn without_log_file(mut self) -> Self {
        self.log_filename.clear();
        self
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML or unknown key
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Log file present and overwrite disabled
    #[error("log file exists with overwrite set to false: {}", path.display())]
    LogFileExists {
        /// Existing log file
        path: PathBuf,
    },

    /// Unparsable log filter
    #[error("invalid log level {level:?}: {reason}")]
    InvalidLogLevel {
        /// Rejected directive
        level: String,
        /// Parser message
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = MonitorConfig::from_toml_str("log_filename = \"\"").unwrap();
        assert!(config.print_task_tree);
        assert!(config.log_overwrite_if_exists);
        assert_eq!(config.log_path(), None);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn defaults_point_at_logs_json() {
        let config = MonitorConfig::default();
        assert_eq!(config.log_path(), Some(Path::new(DEFAULT_LOG_FILENAME)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = MonitorConfig::from_toml_str("ignore_everything = true").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn bad_log_level_is_rejected() {
        let err = MonitorConfig::from_toml_str("log_filename = \"\"\nlog_level = \"tmon=verbose\"").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel { .. }));
    }

    #[test]
    fn without_log_file_clears_path() {
        let config = MonitorConfig::default().without_log_file();
        assert_eq!(config.log_path(), None);
        config.validate().unwrap();
    }
}
