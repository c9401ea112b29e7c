//! Property tests for the shadow tree against random live hierarchies

use proptest::prelude::*;
use tmon_tree::{LiveHierarchy, LiveRef, MemoryHierarchy, ShadowTree, TaskId};

/// Grow a hierarchy from `(pick, fresh_group)` pairs: `pick` selects a
/// running task, `fresh_group` decides between opening a new work-group
/// under it or reusing its last one.
fn grow(steps: &[(usize, bool)]) -> MemoryHierarchy {
    let mut live = MemoryHierarchy::new();
    for (pick, fresh_group) in steps {
        let tasks = live.tasks();
        let parent = tasks[pick % tasks.len()];
        let group = match live.child_groups(parent).last() {
            Some(g) if !fresh_group => *g,
            _ => live.open_group(parent).unwrap(),
        };
        live.spawn(group).unwrap();
    }
    live
}

fn assert_consistent(tree: &ShadowTree<MemoryHierarchy>) {
    assert_eq!(tree.len(), tree.name_count());
    assert_eq!(tree.len(), tree.reachable_count());
    tree.check_consistency().unwrap();
}

fn descendants(tree: &ShadowTree<MemoryHierarchy>, live: &tmon_tree::RefOf<MemoryHierarchy>) -> usize {
    let start = tree.node_by_ref(live).unwrap().id();
    let mut stack = vec![start];
    let mut count = 0;
    while let Some(id) = stack.pop() {
        let node = tree.node(id).unwrap();
        count += node.children().len();
        stack.extend(node.children().iter().copied());
    }
    count
}

/// Ancestors of `live` the upward cascade will take with it
fn emptied_ancestors(tree: &ShadowTree<MemoryHierarchy>, live: &tmon_tree::RefOf<MemoryHierarchy>) -> usize {
    let mut count = 0;
    let mut current = tree.node_by_ref(live).unwrap();
    while let Some(parent) = current.parent().and_then(|p| tree.node(p)) {
        if Some(parent.id()) == tree.root() || parent.children().len() != 1 {
            break;
        }
        count += 1;
        current = parent;
    }
    count
}

fn steps() -> impl Strategy<Value = Vec<(usize, bool)>> {
    proptest::collection::vec((0..64usize, any::<bool>()), 0..40)
}

proptest! {
    #[test]
    fn prop_build_mirrors_every_entity(steps in steps()) {
        let live = grow(&steps);
        let tree = ShadowTree::build(&live, live.root(), None).unwrap();

        prop_assert_eq!(tree.len(), live.entity_count());
        for task in live.tasks() {
            prop_assert!(tree.contains(&LiveRef::Task(task)));
        }
        for group in live.groups() {
            prop_assert!(tree.contains(&LiveRef::Group(group)));
        }
        assert_consistent(&tree);
    }

    #[test]
    fn prop_lookup_agrees_with_oracle(steps in steps()) {
        let live = grow(&steps);
        let tree = ShadowTree::build(&live, live.root(), None).unwrap();

        for live_ref in tree.refs() {
            prop_assert_eq!(
                tree.lookup_parent(live_ref),
                tree.cross_check_parent(&live, live_ref)
            );
        }
    }

    #[test]
    fn prop_group_removal_drops_exact_subtree(steps in steps(), pick in 0..64usize) {
        let live = grow(&steps);
        let groups = live.groups();
        prop_assume!(!groups.is_empty());
        let mut tree = ShadowTree::build(&live, live.root(), None).unwrap();

        let target = LiveRef::Group(groups[pick % groups.len()]);
        let k = descendants(&tree, &target);
        let up = emptied_ancestors(&tree, &target);
        let before = tree.len();

        let removed = tree.remove_ref(&target).unwrap().unwrap();
        prop_assert_eq!(removed.len(), k + 1 + up);
        prop_assert_eq!(removed[k].live, target);
        prop_assert_eq!(tree.len(), before - k - 1 - up);
        prop_assert!(tree.root().is_some());
        prop_assert_eq!(tree.registry().len(), tree.len());
        assert_consistent(&tree);
    }

    #[test]
    fn prop_exits_keep_mirror_in_sync(steps in steps(), exits in proptest::collection::vec(0..64usize, 0..40)) {
        let mut live = grow(&steps);
        let mut tree = ShadowTree::build(&live, live.root(), None).unwrap();

        for pick in exits {
            let leaves = live.leaf_tasks();
            if leaves.is_empty() {
                break;
            }
            let task = leaves[pick % leaves.len()];
            let exits = live.exit_unwinding(task).unwrap();
            let removed = tree.remove_ref(&LiveRef::Task(task)).unwrap().unwrap();

            let expected: usize = exits.iter().map(|e| 1 + usize::from(e.closed_group.is_some())).sum();
            prop_assert_eq!(removed.len(), expected);

            prop_assert_eq!(tree.len(), live.entity_count());
            prop_assert!(tree.oracle_mismatches(&live).is_empty());
        }
        assert_consistent(&tree);
    }

    #[test]
    fn prop_unknown_lookup_is_none(steps in steps(), raw in 1000..2000u32) {
        let live = grow(&steps);
        let tree = ShadowTree::build(&live, live.root(), None).unwrap();
        prop_assert_eq!(tree.lookup_parent(&LiveRef::Task(TaskId(raw))), None);
        prop_assert_eq!(tree.cross_check_parent(&live, &LiveRef::Task(TaskId(raw))), None);
    }
}

#[test]
fn example_scenario() {
    let mut live = MemoryHierarchy::new();
    let r = live.root();
    let g1 = live.open_group(r).unwrap();
    let t1 = live.spawn(g1).unwrap();
    let t2 = live.spawn(g1).unwrap();

    let mut tree = ShadowTree::build(&live, r, None).unwrap();
    assert_eq!(tree.len(), 4);
    assert_eq!(tree.lookup_parent(&LiveRef::Task(t1)), Some(LiveRef::Group(g1)));
    assert_eq!(tree.lookup_parent(&LiveRef::Task(r)), None);

    tree.remove_ref(&LiveRef::Task(t1)).unwrap();
    assert_eq!(tree.len(), 3);
    assert!(tree.contains(&LiveRef::Group(g1)));

    tree.remove_ref(&LiveRef::Task(t2)).unwrap();
    assert_eq!(tree.len(), 1);
    assert!(!tree.contains(&LiveRef::Group(g1)));
    assert_consistent(&tree);
}

#[test]
fn nested_cascade_climbs_to_root() {
    // R -> G1 -> T1 -> G2 -> T2 ; removing T2 empties G2, T1 and G1 in turn
    let mut live = MemoryHierarchy::new();
    let r = live.root();
    let g1 = live.open_group(r).unwrap();
    let t1 = live.spawn(g1).unwrap();
    let g2 = live.open_group(t1).unwrap();
    let t2 = live.spawn(g2).unwrap();

    let mut tree = ShadowTree::build(&live, r, None).unwrap();
    let removed = tree.remove_ref(&LiveRef::Task(t2)).unwrap().unwrap();

    assert_eq!(removed.len(), 4);
    assert!(!tree.contains(&LiveRef::Group(g2)));
    assert!(!tree.contains(&LiveRef::Task(t1)));
    assert!(!tree.contains(&LiveRef::Group(g1)));
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.lookup_parent(&LiveRef::Task(r)), None);
    assert_consistent(&tree);
}
