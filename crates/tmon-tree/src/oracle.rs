//! Ground-truth parent search
//!
//! Ignores the mirror entirely and walks the live hierarchy from the root
//! task. O(n) per query: a verification tool, not a hot path.

use crate::live::{LiveHierarchy, LiveRef, RefOf};
use crate::tree::ShadowTree;

impl<H: LiveHierarchy> ShadowTree<H> {
    /// Parent of `target` according to the live hierarchy
    ///
    /// Depth-first from the root task, first match wins. `None` if `target`
    /// is the root or not reachable.
    #[must_use]
    pub fn cross_check_parent(&self, hierarchy: &H, target: &RefOf<H>) -> Option<RefOf<H>> {
        find_parent(hierarchy, self.root_task(), target)
    }

    /// Work-group currently owning `task` according to the live hierarchy
    #[must_use]
    pub fn cross_check_parent_group(&self, hierarchy: &H, task: H::Task) -> Option<H::Group> {
        self.cross_check_parent(hierarchy, &LiveRef::Task(task))
            .and_then(|p| p.as_group().copied())
    }

    /// Mirrored references whose shadow parent differs from the live one
    ///
    /// Empty when the mirror agrees with ground truth.
    #[must_use]
    pub fn oracle_mismatches(&self, hierarchy: &H) -> Vec<OracleMismatch<RefOf<H>>> {
        let mut mismatches: Vec<_> = self
            .refs()
            .filter_map(|live| {
                let shadow = self.lookup_parent(live);
                let actual = self.cross_check_parent(hierarchy, live);
                (shadow != actual).then_some(OracleMismatch {
                    live: *live,
                    shadow,
                    actual,
                })
            })
            .collect();
        mismatches.sort_by_key(|m| self.node_by_ref(&m.live).map(crate::ShadowNode::id));
        mismatches
    }
}

/// Disagreement between the mirror and the live hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleMismatch<K> {
    /// Mirrored reference
    pub live: K,
    /// Parent according to the shadow tree
    pub shadow: Option<K>,
    /// Parent according to the live hierarchy
    pub actual: Option<K>,
}

fn find_parent<H: LiveHierarchy>(
    hierarchy: &H,
    task: H::Task,
    target: &RefOf<H>,
) -> Option<RefOf<H>> {
    for group in hierarchy.child_groups(task) {
        if *target == LiveRef::Group(group) {
            return Some(LiveRef::Task(task));
        }
        let tasks = hierarchy.child_tasks(group);
        if let LiveRef::Task(wanted) = target {
            if tasks.contains(wanted) {
                return Some(LiveRef::Group(group));
            }
        }
        for child in tasks {
            if let Some(found) = find_parent(hierarchy, child, target) {
                return Some(found);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use crate::live::LiveRef;
    use crate::memory::{MemoryHierarchy, TaskId};
    use crate::tree::ShadowTree;

    #[test]
    fn oracle_finds_nested_parents() {
        let mut live = MemoryHierarchy::new();
        let root = live.root();
        let g1 = live.open_group(root).unwrap();
        let t1 = live.spawn(g1).unwrap();
        let g2 = live.open_group(t1).unwrap();
        let t2 = live.spawn(g2).unwrap();

        let tree = ShadowTree::build(&live, root, None).unwrap();
        assert_eq!(tree.cross_check_parent_group(&live, t2), Some(g2));
        assert_eq!(tree.cross_check_parent(&live, &LiveRef::Group(g2)), Some(LiveRef::Task(t1)));
        assert_eq!(tree.cross_check_parent(&live, &LiveRef::Task(root)), None);
        assert_eq!(tree.cross_check_parent_group(&live, TaskId(1234)), None);
        assert!(tree.oracle_mismatches(&live).is_empty());
    }

    #[test]
    fn oracle_reports_stale_mirror() {
        let mut live = MemoryHierarchy::new();
        let root = live.root();
        let g1 = live.open_group(root).unwrap();
        let t1 = live.spawn(g1).unwrap();
        let tree = ShadowTree::build(&live, root, None).unwrap();

        // exit without telling the mirror
        live.exit(t1).unwrap();

        let mismatches = tree.oracle_mismatches(&live);
        assert_eq!(mismatches.len(), 2);
        assert!(mismatches.iter().all(|m| m.actual.is_none()));
    }
}
