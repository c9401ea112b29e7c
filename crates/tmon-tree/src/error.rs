//! Error types for the shadow tree
//!
//! Every [`TreeError`] means the mirror can no longer be trusted: either an
//! earlier mutation went unchecked, or the scheduler broke its notification
//! contract. Unknown references are not errors; queries return `None`.

use crate::memory::{GroupId, TaskId};
use crate::node::NodeId;

/// Shadow tree error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// Tree and an index disagree
    #[error("structural corruption at {node} ({name}): {kind}")]
    StructuralCorruption {
        /// Node where the check failed
        node: NodeId,
        /// Registry name of the node, if it could be resolved
        name: String,
        /// Which invariant broke
        kind: CorruptionKind,
    },

    /// Reference or name already mirrored
    #[error("duplicate registration of {name}: {kind}")]
    DuplicateRegistration {
        /// Registry name of the rejected entity
        name: String,
        /// Which index already held it
        kind: DuplicateKind,
    },

    /// Incremental add for an entity whose live parent is not mirrored
    #[error("parent of {live} is not mirrored")]
    DetachedParent {
        /// The entity being added
        live: String,
    },
}

impl TreeError {
    /// Build a structural corruption error
    #[inline]
    pub fn corruption(node: NodeId, name: impl Into<String>, kind: CorruptionKind) -> Self {
        Self::StructuralCorruption {
            node,
            name: name.into(),
            kind,
        }
    }

    /// Check if the tree and its indexes were found to disagree
    #[inline]
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::StructuralCorruption { .. })
    }

    /// Check if the scheduler most likely delivered a notification twice
    #[inline]
    #[must_use]
    pub fn is_double_notification(&self) -> bool {
        matches!(self, Self::DuplicateRegistration { .. })
    }
}

/// Invariant broken by a structural corruption
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CorruptionKind {
    /// Node id has no arena slot
    #[error("node is not in the tree")]
    NodeMissing,

    /// Registry lost the entry for a mirrored reference
    #[error("registry entry missing")]
    RegistryEntryMissing,

    /// Name index does not map the node's name to the node
    #[error("name index does not point at node")]
    NameIndexMismatch,

    /// Reverse index does not map the node's reference to the node
    #[error("reference index does not point at node")]
    RefIndexMismatch,

    /// Parent does not list the node among its children
    #[error("parent {parent} does not list node as child")]
    ParentLinkBroken {
        /// Claimed parent
        parent: NodeId,
    },

    /// Child's back-reference names a different parent
    #[error("child {child} points at a different parent")]
    ChildLinkBroken {
        /// Offending child
        child: NodeId,
    },

    /// Parent chain ends somewhere other than the root
    #[error("node not reachable from root")]
    Unreachable,

    /// Index sizes disagree with the reachable node count
    #[error("index sizes disagree: nodes={nodes} reachable={reachable} refs={refs} names={names}")]
    CountMismatch {
        /// Arena slots
        nodes: usize,
        /// Nodes reachable from root
        reachable: usize,
        /// Reverse index entries
        refs: usize,
        /// Name index entries
        names: usize,
    },
}

/// Which index rejected a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DuplicateKind {
    /// Live reference already mirrored
    #[error("reference already mirrored")]
    Reference,

    /// Name already taken in the name index
    #[error("name already indexed")]
    Name,
}

/// In-memory scheduler model errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiveError {
    /// Task does not exist (never spawned or already exited)
    #[error("unknown task: {0}")]
    UnknownTask(TaskId),

    /// Work-group does not exist (never opened or already closed)
    #[error("unknown work-group: {0}")]
    UnknownGroup(GroupId),

    /// Task still owns open work-groups and cannot exit
    #[error("{task} still owns {open} open work-group(s)")]
    OpenGroups {
        /// Exiting task
        task: TaskId,
        /// Number of groups still open
        open: usize,
    },

    /// Work-group still owns tasks and cannot close
    #[error("{group} still owns {live} task(s)")]
    GroupNotEmpty {
        /// Closing group
        group: GroupId,
        /// Number of tasks still running
        live: usize,
    },

    /// The root task exits only when the scheduler shuts down
    #[error("root task cannot exit")]
    RootExit,
}
