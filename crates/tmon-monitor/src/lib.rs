//! TMON Monitor
//!
//! Keeps a [`ShadowTree`](tmon_tree::ShadowTree) in step with a running
//! scheduler.
//!
//! # Overview
//!
//! - [`TreeMonitor`]: turns spawn / exit notifications into tree mutations
//!   and stops trusting the tree after the first invariant failure
//! - [`MonitorConfig`]: TOML configuration for output and logging
//! - [`telemetry::init`]: tracing subscriber writing JSON lines to the log file
//! - [`run_simulator`]: seeded workload checking the mirror after every step
//!
//! # Example
//!
//! ```rust
//! use tmon_monitor::{MonitorConfig, Outcome, TreeMonitor};
//! use tmon_tree::MemoryHierarchy;
//!
//! let mut live = MemoryHierarchy::new();
//! let config = MonitorConfig { print_task_tree: false, ..MonitorConfig::default() };
//! let mut monitor = TreeMonitor::new(config);
//! monitor.start(&live, live.root()).unwrap();
//!
//! let group = live.open_group(live.root()).unwrap();
//! let task = live.spawn(group).unwrap();
//! monitor.on_task_spawned(&live, task).unwrap();
//!
//! live.exit(task).unwrap();
//! assert_eq!(monitor.on_task_exited(task).unwrap(), Outcome::Removed(2));
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod monitor;
pub mod render;
pub mod simulator;
pub mod telemetry;

// Re-exports
pub use config::{ConfigError, MonitorConfig, DEFAULT_LOG_FILENAME};
pub use error::MonitorError;
pub use monitor::{MonitorState, MonitorStats, OracleReport, Outcome, TreeMonitor};
pub use render::render_text;
pub use simulator::{run_simulator, SimulatedOperation, SimulationReport, SimulatorConfig, Violation};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for monitor consumers
    pub use crate::{MonitorConfig, MonitorError, Outcome, TreeMonitor};
    pub use tmon_tree::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
