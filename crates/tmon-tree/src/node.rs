//! Mirrored vertices
//!
//! Nodes live in the tree's arena and refer to each other by [`NodeId`].
//! `children` is the owning direction; `parent` is a plain back-reference.

use serde::{Deserialize, Serialize};
use std::fmt;
use tmon_registry::{Labeled, RegisteredInfo, Registry};

/// Arena handle of a shadow node
///
/// Ids are never reused within one tree, so a stale id can't alias a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Wrap a raw id
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw id value
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One mirrored task or work-group
#[derive(Debug, Clone)]
pub struct ShadowNode<K> {
    pub(crate) id: NodeId,
    pub(crate) live: K,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl<K> ShadowNode<K> {
    pub(crate) fn new(id: NodeId, live: K, parent: Option<NodeId>) -> Self {
        Self {
            id,
            live,
            parent,
            children: Vec::new(),
        }
    }

    /// Arena id
    #[inline]
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Live reference this node mirrors
    #[inline]
    pub fn live(&self) -> &K {
        &self.live
    }

    /// Parent node, `None` for the root
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in discovery order
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Registry info for this node's reference, `None` if the registry lost it
    pub fn info<R>(&self, registry: &R) -> Option<RegisteredInfo>
    where
        R: Registry<K> + ?Sized,
        K: Labeled + Eq + std::hash::Hash + Clone,
    {
        registry.peek(&self.live)
    }
}

/// Record of one node dropped by a cascading removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedNode<K> {
    /// Arena id the node had
    pub id: NodeId,
    /// Live reference it mirrored
    pub live: K,
    /// Name it was indexed under
    pub name: String,
}
