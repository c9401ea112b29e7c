//! Shadow tree with reverse and name indexes
//!
//! Provides [`ShadowTree`]: the mirror itself plus the two lookup indexes.
//! Tree edges, `ref_to_node` and `name_to_node` are only ever changed
//! together, inside one `&mut self` call.

use crate::error::{CorruptionKind, DuplicateKind, TreeError};
use crate::live::{LiveHierarchy, LiveRef, RefOf};
use crate::node::{NodeId, RemovedNode, ShadowNode};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tmon_registry::{RegisteredInfo, Registry, SequentialRegistry};

/// Registry handle shared between the tree and renderers
pub type SharedRegistry<K> = Arc<dyn Registry<K>>;

/// Mirror of the live hierarchy rooted at one task
///
/// Not synchronized: notifications are expected one at a time on a single
/// thread. Wrap the whole tree in one lock if that ever changes.
pub struct ShadowTree<H: LiveHierarchy> {
    root: Option<NodeId>,
    root_task: H::Task,
    nodes: HashMap<NodeId, ShadowNode<RefOf<H>>>,
    ref_to_node: HashMap<RefOf<H>, NodeId>,
    name_to_node: HashMap<String, NodeId>,
    registry: SharedRegistry<RefOf<H>>,
    next_id: u64,
    _hierarchy: PhantomData<fn() -> H>,
}

impl<H: LiveHierarchy> ShadowTree<H> {
    /// Mirror everything reachable from `root`
    ///
    /// Nodes are registered pre-order: each node enters both indexes before
    /// its own subtree is expanded. A fresh [`SequentialRegistry`] is used
    /// when `registry` is `None`.
    ///
    /// # Errors
    /// Returns [`TreeError::DuplicateRegistration`] if the live hierarchy
    /// reaches the same entity twice
    pub fn build(
        hierarchy: &H,
        root: H::Task,
        registry: Option<SharedRegistry<RefOf<H>>>,
    ) -> Result<Self, TreeError> {
        let registry = registry
            .unwrap_or_else(|| Arc::new(SequentialRegistry::<RefOf<H>>::new()) as SharedRegistry<RefOf<H>>);
        let mut tree = Self {
            root: None,
            root_task: root,
            nodes: HashMap::new(),
            ref_to_node: HashMap::new(),
            name_to_node: HashMap::new(),
            registry,
            next_id: 0,
            _hierarchy: PhantomData,
        };

        let root_id = tree.register(LiveRef::Task(root), None)?;
        tree.root = Some(root_id);
        tree.expand_task(hierarchy, root_id, root)?;

        tracing::debug!(nodes = tree.len(), "shadow tree built");
        tree.after_mutation()?;
        Ok(tree)
    }

    fn expand_task(&mut self, hierarchy: &H, node: NodeId, task: H::Task) -> Result<(), TreeError> {
        for group in hierarchy.child_groups(task) {
            let child = self.register(LiveRef::Group(group), Some(node))?;
            self.expand_group(hierarchy, child, group)?;
        }
        Ok(())
    }

    fn expand_group(&mut self, hierarchy: &H, node: NodeId, group: H::Group) -> Result<(), TreeError> {
        for task in hierarchy.child_tasks(group) {
            let child = self.register(LiveRef::Task(task), Some(node))?;
            self.expand_task(hierarchy, child, task)?;
        }
        Ok(())
    }

    /// Create a node, link it under `parent` and enter it in both indexes
    fn register(&mut self, live: RefOf<H>, parent: Option<NodeId>) -> Result<NodeId, TreeError> {
        let name = self.registry.get_name(&live);
        self.ensure_not_in_tree(&live, &name)?;

        let id = NodeId::new(self.next_id);
        if let Some(p) = parent {
            let parent_node = self
                .nodes
                .get_mut(&p)
                .ok_or_else(|| TreeError::corruption(p, "<unknown>", CorruptionKind::NodeMissing))?;
            parent_node.children.push(id);
        }
        self.next_id += 1;

        self.nodes.insert(id, ShadowNode::new(id, live, parent));
        self.ref_to_node.insert(live, id);
        self.name_to_node.insert(name.clone(), id);

        tracing::debug!(node = %id, %name, "mirrored");
        Ok(id)
    }

    /// Mirror a task the scheduler just spawned
    ///
    /// The task's live work-group is mirrored first if this is its first
    /// task. Any subtree the task already owns is mirrored too.
    ///
    /// # Errors
    /// - [`TreeError::DuplicateRegistration`] if the task is already mirrored
    /// - [`TreeError::DetachedParent`] if the owning task is not mirrored
    pub fn attach_task(&mut self, hierarchy: &H, task: H::Task) -> Result<NodeId, TreeError> {
        let live = LiveRef::Task(task);
        if self.contains(&live) {
            self.ensure_not_in_tree(&live, &self.display_name(&live))?;
        }

        let detached = || TreeError::DetachedParent {
            live: live.to_string(),
        };
        let group = hierarchy.parent_group(task).ok_or_else(detached)?;

        let group_node = match self.ref_to_node.get(&LiveRef::Group(group)) {
            Some(id) => *id,
            None => {
                let owner = hierarchy.group_owner(group).ok_or_else(detached)?;
                let owner_node = *self
                    .ref_to_node
                    .get(&LiveRef::Task(owner))
                    .ok_or_else(detached)?;
                self.ensure_in_tree(owner_node)?;
                self.register(LiveRef::Group(group), Some(owner_node))?
            }
        };
        self.ensure_in_tree(group_node)?;

        let id = self.register(live, Some(group_node))?;
        self.expand_task(hierarchy, id, task)?;
        self.after_mutation()?;
        Ok(id)
    }

    /// Remove `id`, its whole subtree, and every ancestor it leaves empty
    ///
    /// The cascade climbs until it reaches a parent that still has other
    /// children, or the root, which is never removed implicitly. Returned
    /// records are in removal order: descendants before their parent,
    /// cascaded ancestors last, nearest first.
    ///
    /// # Errors
    /// Returns [`TreeError::StructuralCorruption`] if `id` is not in the
    /// tree or the indexes disagree about it
    pub fn remove(&mut self, id: NodeId) -> Result<Vec<RemovedNode<RefOf<H>>>, TreeError> {
        let mut removed = Vec::new();
        self.remove_node(id, true, &mut removed)?;
        tracing::debug!(node = %id, removed = removed.len(), "cascading removal done");
        self.after_mutation()?;
        Ok(removed)
    }

    /// Remove the node mirroring `live`
    ///
    /// Returns `Ok(None)` if `live` is not mirrored.
    ///
    /// # Errors
    /// Same as [`ShadowTree::remove`]
    pub fn remove_ref(
        &mut self,
        live: &RefOf<H>,
    ) -> Result<Option<Vec<RemovedNode<RefOf<H>>>>, TreeError> {
        match self.ref_to_node.get(live).copied() {
            Some(id) => self.remove(id).map(Some),
            None => Ok(None),
        }
    }

    fn remove_node(
        &mut self,
        id: NodeId,
        cascade_up: bool,
        removed: &mut Vec<RemovedNode<RefOf<H>>>,
    ) -> Result<(), TreeError> {
        self.ensure_in_tree(id)?;
        let (live, children) = match self.nodes.get(&id) {
            Some(node) => (node.live, node.children.clone()),
            None => return Err(TreeError::corruption(id, "<unknown>", CorruptionKind::NodeMissing)),
        };
        let name = self.display_name(&live);

        self.ref_to_node.remove(&live);
        self.name_to_node.remove(&name);

        // The parent is going away too, so children must not cascade into it
        for child in children {
            self.remove_node(child, false, removed)?;
        }

        let node = self
            .nodes
            .remove(&id)
            .ok_or_else(|| TreeError::corruption(id, name.clone(), CorruptionKind::NodeMissing))?;

        removed.push(RemovedNode {
            id,
            live,
            name: name.clone(),
        });

        match node.parent {
            Some(parent) => {
                let emptied = {
                    let parent_node = self.nodes.get_mut(&parent).ok_or_else(|| {
                        TreeError::corruption(id, name.clone(), CorruptionKind::ParentLinkBroken { parent })
                    })?;
                    parent_node.children.retain(|c| *c != id);
                    parent_node.children.is_empty()
                };
                // The scheduler never reports work-group closure, so an
                // emptied parent goes too; the root always stays
                if cascade_up && emptied && self.root != Some(parent) {
                    tracing::debug!(parent = %parent, "parent emptied, removing");
                    self.remove_node(parent, true, removed)?;
                }
            }
            None => self.root = None,
        }

        self.registry.remove(&live);
        Ok(())
    }

    /// Assert `id` is a live member of the tree
    ///
    /// Checks the registry still knows the node, both indexes point at it,
    /// and its parent chain leads to the root.
    ///
    /// # Errors
    /// Returns [`TreeError::StructuralCorruption`] naming the broken invariant
    pub fn ensure_in_tree(&self, id: NodeId) -> Result<(), TreeError> {
        let node = self
            .nodes
            .get(&id)
            .ok_or_else(|| TreeError::corruption(id, "<unknown>", CorruptionKind::NodeMissing))?;

        let Some(name) = self.registry.peek_name(&node.live) else {
            return Err(TreeError::corruption(
                id,
                node.live.to_string(),
                CorruptionKind::RegistryEntryMissing,
            ));
        };

        if self.name_to_node.get(&name) != Some(&id) {
            return Err(TreeError::corruption(id, name, CorruptionKind::NameIndexMismatch));
        }
        if self.ref_to_node.get(&node.live) != Some(&id) {
            return Err(TreeError::corruption(id, name, CorruptionKind::RefIndexMismatch));
        }

        let mut current = node;
        while let Some(parent) = current.parent {
            let parent_node = self.nodes.get(&parent).ok_or_else(|| {
                TreeError::corruption(id, name.clone(), CorruptionKind::ParentLinkBroken { parent })
            })?;
            if !parent_node.children.contains(&current.id) {
                return Err(TreeError::corruption(
                    current.id,
                    name,
                    CorruptionKind::ParentLinkBroken { parent },
                ));
            }
            current = parent_node;
        }
        if self.root != Some(current.id) {
            return Err(TreeError::corruption(id, name, CorruptionKind::Unreachable));
        }
        Ok(())
    }

    /// Assert neither `live` nor `name` is indexed yet
    ///
    /// # Errors
    /// Returns [`TreeError::DuplicateRegistration`] naming the index that
    /// already holds it
    pub fn ensure_not_in_tree(&self, live: &RefOf<H>, name: &str) -> Result<(), TreeError> {
        if self.ref_to_node.contains_key(live) {
            return Err(TreeError::DuplicateRegistration {
                name: name.to_string(),
                kind: DuplicateKind::Reference,
            });
        }
        if self.name_to_node.contains_key(name) {
            return Err(TreeError::DuplicateRegistration {
                name: name.to_string(),
                kind: DuplicateKind::Name,
            });
        }
        Ok(())
    }

    /// Full O(n) verification of tree / index agreement
    ///
    /// # Errors
    /// Returns the first [`TreeError::StructuralCorruption`] found
    pub fn check_consistency(&self) -> Result<(), TreeError> {
        let reachable = self.reachable_count();
        let counts = (self.nodes.len(), self.ref_to_node.len(), self.name_to_node.len());
        if counts != (reachable, reachable, reachable) {
            let at = self.root.unwrap_or(NodeId::new(0));
            return Err(TreeError::corruption(
                at,
                "<tree>",
                CorruptionKind::CountMismatch {
                    nodes: counts.0,
                    reachable,
                    refs: counts.1,
                    names: counts.2,
                },
            ));
        }

        for node in self.nodes.values() {
            for child in &node.children {
                let linked = self.nodes.get(child).and_then(|c| c.parent);
                if linked != Some(node.id) {
                    return Err(TreeError::corruption(
                        node.id,
                        self.display_name(&node.live),
                        CorruptionKind::ChildLinkBroken { child: *child },
                    ));
                }
            }
        }

        for id in self.ref_to_node.values() {
            self.ensure_in_tree(*id)?;
        }
        Ok(())
    }

    fn after_mutation(&self) -> Result<(), TreeError> {
        if crate::strict_debug() {
            self.check_consistency()
        } else {
            Ok(())
        }
    }

    /// Parent reference of `live`, O(1)
    ///
    /// `None` if `live` is unknown or is the root.
    #[must_use]
    pub fn lookup_parent(&self, live: &RefOf<H>) -> Option<RefOf<H>> {
        let node = self.ref_to_node.get(live).and_then(|id| self.nodes.get(id))?;
        let parent = node.parent.and_then(|p| self.nodes.get(&p))?;
        Some(parent.live)
    }

    /// Mirrored parent work-group of `task`
    #[must_use]
    pub fn parent_group(&self, task: H::Task) -> Option<H::Group> {
        self.lookup_parent(&LiveRef::Task(task))
            .and_then(|p| p.as_group().copied())
    }

    /// Root node, `None` once the root itself was removed
    #[inline]
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Live task the tree was built from
    #[inline]
    pub fn root_task(&self) -> H::Task {
        self.root_task
    }

    /// Node by arena id
    #[inline]
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&ShadowNode<RefOf<H>>> {
        self.nodes.get(&id)
    }

    /// Node mirroring `live`
    #[must_use]
    pub fn node_by_ref(&self, live: &RefOf<H>) -> Option<&ShadowNode<RefOf<H>>> {
        self.ref_to_node.get(live).and_then(|id| self.nodes.get(id))
    }

    /// Node by registry name (debugging aid)
    #[must_use]
    pub fn node_by_name(&self, name: &str) -> Option<&ShadowNode<RefOf<H>>> {
        self.name_to_node.get(name).and_then(|id| self.nodes.get(id))
    }

    /// Check if `live` is mirrored
    #[inline]
    #[must_use]
    pub fn contains(&self, live: &RefOf<H>) -> bool {
        self.ref_to_node.contains_key(live)
    }

    /// Registry info for node `id`
    #[must_use]
    pub fn info(&self, id: NodeId) -> Option<RegisteredInfo> {
        self.nodes.get(&id).and_then(|n| n.info(self.registry.as_ref()))
    }

    /// Registry name of `live`, or its reference if the registry has no entry
    ///
    /// Never registers: only [`ShadowTree::build`] and
    /// [`ShadowTree::attach_task`] write to the registry.
    #[must_use]
    pub fn display_name(&self, live: &RefOf<H>) -> String {
        self.registry
            .peek_name(live)
            .unwrap_or_else(|| live.to_string())
    }

    /// Registry handle
    #[inline]
    pub fn registry(&self) -> &SharedRegistry<RefOf<H>> {
        &self.registry
    }

    /// Mirrored references, in no particular order
    pub fn refs(&self) -> impl Iterator<Item = &RefOf<H>> + '_ {
        self.ref_to_node.keys()
    }

    /// Number of mirrored nodes (reverse index size)
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ref_to_node.len()
    }

    /// Check if the tree mirrors nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ref_to_node.is_empty()
    }

    /// Name index size
    #[inline]
    #[must_use]
    pub fn name_count(&self) -> usize {
        self.name_to_node.len()
    }

    /// Nodes reachable from the root by following child links
    #[must_use]
    pub fn reachable_count(&self) -> usize {
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        let mut count = 0;
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                count += 1;
                stack.extend(node.children.iter().copied());
            }
        }
        count
    }

    #[cfg(test)]
    pub(crate) fn index_mut_for_test(&mut self) -> &mut HashMap<String, NodeId> {
        &mut self.name_to_node
    }
}

impl<H: LiveHierarchy> std::fmt::Debug for ShadowTree<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowTree")
            .field("root", &self.root)
            .field("nodes", &self.nodes.len())
            .field("refs", &self.ref_to_node.len())
            .field("names", &self.name_to_node.len())
            .finish()
    }
}
