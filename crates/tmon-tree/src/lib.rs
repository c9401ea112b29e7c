//! TMON Shadow Tree
//!
//! Incrementally maintained mirror of a cooperative scheduler's live
//! task / work-group hierarchy.
//!
//! # Overview
//!
//! The scheduler only exposes transient references and "task spawned" /
//! "task exited" notifications. This crate keeps:
//! - **ShadowTree**: one [`ShadowNode`] per live entity, with O(1)
//!   parent-of and lookup-by-reference
//! - a reverse index and a name index kept in lock-step with the tree
//! - cascading removal that also drops every non-root ancestor left
//!   empty, since the scheduler never reports group closure
//! - an O(n) oracle that re-derives parents from the live hierarchy
//!
//! # Example
//!
//! ```rust
//! use tmon_tree::{LiveRef, MemoryHierarchy, ShadowTree};
//!
//! let mut live = MemoryHierarchy::new();
//! let root = live.root();
//! let group = live.open_group(root).unwrap();
//! let t1 = live.spawn(group).unwrap();
//! let t2 = live.spawn(group).unwrap();
//!
//! let mut tree = ShadowTree::build(&live, root, None).unwrap();
//! assert_eq!(tree.len(), 4);
//! assert_eq!(tree.lookup_parent(&LiveRef::Task(t1)), Some(LiveRef::Group(group)));
//!
//! tree.remove_ref(&LiveRef::Task(t1)).unwrap();
//! tree.remove_ref(&LiveRef::Task(t2)).unwrap();
//! assert_eq!(tree.len(), 1);
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod live;
pub mod memory;
pub mod node;
pub mod oracle;
pub mod tree;
pub mod walk;

// Re-exports
pub use error::{CorruptionKind, DuplicateKind, LiveError, TreeError};
pub use live::{LiveHierarchy, LiveRef, RefOf};
pub use memory::{GroupId, MemoryHierarchy, TaskExit, TaskId};
pub use node::{NodeId, RemovedNode, ShadowNode};
pub use oracle::OracleMismatch;
pub use tree::{SharedRegistry, ShadowTree};
pub use walk::{Divergence, Walk, WalkEntry};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for shadow tree consumers
    pub use crate::{
        Divergence, LiveHierarchy, LiveRef, NodeId, RefOf, ShadowNode, ShadowTree, TreeError,
        WalkEntry,
    };
    pub use tmon_registry::{EntityKind, Registry, SequentialRegistry};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Check if running with strict debugging enabled
#[must_use]
pub const fn strict_debug() -> bool {
    cfg!(feature = "strict-debug")
}
