//! Error types for the monitor
//!
//! A [`MonitorError::Tree`] is never retried: the monitor poisons itself
//! and refuses further notifications.

use crate::config::ConfigError;
use std::path::PathBuf;
use tmon_tree::TreeError;

/// Main monitor error type
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Configuration failed to load or validate
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Shadow tree invariant violated
    #[error("shadow tree error: {0}")]
    Tree(#[from] TreeError),

    /// Monitor stopped trusting its tree after an earlier failure
    #[error("monitor is poisoned: {reason}")]
    Poisoned {
        /// The failure that poisoned it
        reason: String,
    },

    /// Notification received before `start`
    #[error("monitor not started")]
    NotStarted,

    /// `start` called on a monitor that already mirrors a tree
    #[error("monitor already started")]
    AlreadyStarted,

    /// Log file could not be opened
    #[error("cannot open log file {}: {source}", path.display())]
    LogFile {
        /// Log file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Global subscriber could not be installed
    #[error("logging setup failed: {0}")]
    Telemetry(String),
}

impl MonitorError {
    /// Check if the monitor can keep processing notifications after this
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotStarted | Self::AlreadyStarted)
    }
}
