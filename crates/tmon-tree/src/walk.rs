//! Read-only traversal for renderers, and first-divergence comparison

use crate::live::{LiveHierarchy, RefOf};
use crate::node::NodeId;
use crate::tree::ShadowTree;
use serde::Serialize;
use tmon_registry::{EntityKind, Labeled};

/// One step of a pre-order walk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalkEntry<K> {
    /// Arena id
    pub id: NodeId,
    /// Distance from the root (root is 0)
    pub depth: usize,
    /// Task or work-group
    pub kind: EntityKind,
    /// Registry display name
    pub name: String,
    /// Mirrored reference
    pub live: K,
}

/// Pre-order iterator over a shadow tree, root first
pub struct Walk<'a, H: LiveHierarchy> {
    tree: &'a ShadowTree<H>,
    stack: Vec<(NodeId, usize)>,
}

impl<H: LiveHierarchy> Iterator for Walk<'_, H> {
    type Item = WalkEntry<RefOf<H>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (id, depth) = self.stack.pop()?;
            let Some(node) = self.tree.node(id) else {
                continue;
            };
            self.stack
                .extend(node.children().iter().rev().map(|c| (*c, depth + 1)));
            return Some(WalkEntry {
                id,
                depth,
                kind: node.live().kind(),
                name: self.tree.display_name(node.live()),
                live: *node.live(),
            });
        }
    }
}

/// First position where two pre-order walks disagree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence<K> {
    /// Index in pre-order
    pub position: usize,
    /// Entry on our side, `None` if our walk ended first
    pub ours: Option<WalkEntry<K>>,
    /// Entry on the other side, `None` if that walk ended first
    pub theirs: Option<WalkEntry<K>>,
}

impl<H: LiveHierarchy> ShadowTree<H> {
    /// Pre-order traversal yielding depth and display name per node
    #[must_use]
    pub fn walk(&self) -> Walk<'_, H> {
        Walk {
            tree: self,
            stack: self.root().map(|r| (r, 0)).into_iter().collect(),
        }
    }

    /// First node where `self` and `other` differ
    ///
    /// Walks both trees in pre-order side by side and stops at the first
    /// entry whose depth or live reference differs. Names are not compared,
    /// so trees built with different registries can be diffed.
    #[must_use]
    pub fn first_divergence(&self, other: &ShadowTree<H>) -> Option<Divergence<RefOf<H>>> {
        let mut ours = self.walk();
        let mut theirs = other.walk();
        let mut position = 0;
        loop {
            match (ours.next(), theirs.next()) {
                (None, None) => return None,
                (Some(a), Some(b)) if a.depth == b.depth && a.live == b.live => position += 1,
                (a, b) => {
                    return Some(Divergence {
                        position,
                        ours: a,
                        theirs: b,
                    })
                }
            }
        }
    }
}
