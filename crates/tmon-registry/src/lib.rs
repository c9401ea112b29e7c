//! TMON Registry
//!
//! Stable display identities for live scheduler references.
//!
//! # Overview
//!
//! The scheduler only hands out transient references. The registry gives
//! each one a stable, unique, human-readable name plus a little metadata:
//! - **Registry**: the narrow interface consumed by the shadow tree
//! - **SequentialRegistry**: default implementation, names like `Task-3`
//! - **RegisteredInfo**: name, kind, sequence number and registration time
//!
//! # Example
//!
//! ```rust
//! use tmon_registry::{EntityKind, Labeled, Registry, SequentialRegistry};
//!
//! #[derive(Clone, PartialEq, Eq, Hash)]
//! struct Job(u32);
//!
//! impl Labeled for Job {
//!     fn kind(&self) -> EntityKind {
//!         EntityKind::Task
//!     }
//! }
//!
//! let registry = SequentialRegistry::new();
//! let name = registry.get_name(&Job(7));
//! assert_eq!(name, "Task-1");
//! assert_eq!(registry.get_name(&Job(7)), name);
//! ```

#![warn(missing_docs)]

pub mod info;
pub mod sequential;

pub use info::{EntityKind, Labeled, RegisteredInfo};
pub use sequential::SequentialRegistry;

use std::hash::Hash;

/// Name and metadata provider for live references
///
/// Implementations must hand out the same name for a key for as long as it
/// stays registered, and must never hand the same name to two live keys.
pub trait Registry<K>: Send + Sync
where
    K: Labeled + Eq + Hash + Clone,
{
    /// Get info for `key`, registering it on first sight
    fn get_info(&self, key: &K) -> RegisteredInfo;

    /// Get the display name for `key`, registering it on first sight
    fn get_name(&self, key: &K) -> String {
        self.get_info(key).name
    }

    /// Get info for `key` without registering it
    fn peek(&self, key: &K) -> Option<RegisteredInfo>;

    /// Get the display name for `key` without registering it
    fn peek_name(&self, key: &K) -> Option<String> {
        self.peek(key).map(|info| info.name)
    }

    /// Release the entry for `key`
    ///
    /// Returns the released info, or `None` if the key was not registered.
    fn remove(&self, key: &K) -> Option<RegisteredInfo>;

    /// Check if `key` currently has an entry (never registers)
    fn contains(&self, key: &K) -> bool;

    /// Number of live entries
    fn len(&self) -> usize;

    /// Check if registry has no entries
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for registry consumers
    pub use crate::{EntityKind, Labeled, RegisteredInfo, Registry, SequentialRegistry};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
