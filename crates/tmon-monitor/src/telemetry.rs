//! Logging setup
//!
//! JSON lines to the configured log file, or human-readable output on
//! stderr when file logging is off. `RUST_LOG` overrides `log_level`.

use crate::config::MonitorConfig;
use crate::error::MonitorError;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber described by `config`
///
/// # Errors
/// - [`MonitorError::Config`] if the config does not validate
/// - [`MonitorError::LogFile`] if the log file can't be created
/// - [`MonitorError::Telemetry`] if a global subscriber is already set
pub fn init(config: &MonitorConfig) -> Result<(), MonitorError> {
    config.validate()?;
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| MonitorError::Telemetry(e.to_string()))?;

    let installed = match config.log_path() {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
                .map_err(|source| MonitorError::LogFile {
                    path: path.to_path_buf(),
                    source,
                })?;
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    installed.map_err(|e| MonitorError::Telemetry(e.to_string()))
}
