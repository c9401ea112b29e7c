//! Testing utilities for TMON workspace
//!
//! Shared live-hierarchy fixtures and shadow tree assertions.

#![allow(missing_docs)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tmon_registry::SequentialRegistry;
use tmon_tree::{
    GroupId, LiveHierarchy, LiveRef, MemoryHierarchy, RefOf, ShadowTree, SharedRegistry, TaskId,
};

pub type MemTree = ShadowTree<MemoryHierarchy>;
pub type MemRef = RefOf<MemoryHierarchy>;

/// Handles of the canonical R -> G1 -> {T1, T2} hierarchy
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub root: TaskId,
    pub g1: GroupId,
    pub t1: TaskId,
    pub t2: TaskId,
}

pub fn sample_hierarchy() -> (MemoryHierarchy, Sample) {
    let mut live = MemoryHierarchy::new();
    let root = live.root();
    let g1 = live.open_group(root).unwrap();
    let t1 = live.spawn(g1).unwrap();
    let t2 = live.spawn(g1).unwrap();
    (live, Sample { root, g1, t1, t2 })
}

/// Random hierarchy with `spawns` tasks below the root
pub fn random_hierarchy(seed: u64, spawns: usize) -> MemoryHierarchy {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut live = MemoryHierarchy::new();
    for _ in 0..spawns {
        let tasks = live.tasks();
        let parent = tasks[rng.gen_range(0..tasks.len())];
        let groups = live.child_groups(parent);
        let group = if groups.is_empty() || rng.gen_bool(0.3) {
            live.open_group(parent).unwrap()
        } else {
            groups[rng.gen_range(0..groups.len())]
        };
        live.spawn(group).unwrap();
    }
    live
}

pub fn shared_registry() -> Arc<SequentialRegistry<MemRef>> {
    Arc::new(SequentialRegistry::new())
}

pub fn build_with(live: &MemoryHierarchy, registry: Arc<SequentialRegistry<MemRef>>) -> MemTree {
    let shared: SharedRegistry<MemRef> = registry;
    ShadowTree::build(live, live.root(), Some(shared)).unwrap()
}

pub fn build(live: &MemoryHierarchy) -> MemTree {
    ShadowTree::build(live, live.root(), None).unwrap()
}

/// Panics unless both indexes and the reachable count agree
pub fn assert_tree_consistent(tree: &MemTree) {
    assert_eq!(tree.len(), tree.name_count(), "reverse index vs name index");
    assert_eq!(tree.len(), tree.reachable_count(), "reverse index vs reachable nodes");
    if let Err(e) = tree.check_consistency() {
        panic!("tree inconsistent: {e}");
    }
}

/// Panics unless every mirrored node's parent matches the live hierarchy
pub fn assert_oracle_agreement(tree: &MemTree, live: &MemoryHierarchy) {
    let mismatches = tree.oracle_mismatches(live);
    assert!(mismatches.is_empty(), "oracle disagrees: {mismatches:?}");
}

/// Panics unless the tree mirrors exactly the live entities
pub fn assert_mirrors(tree: &MemTree, live: &MemoryHierarchy) {
    assert_eq!(tree.len(), live.entity_count(), "mirrored vs live entity count");
    for task in live.tasks() {
        assert!(tree.contains(&LiveRef::Task(task)), "task {task} not mirrored");
    }
    for group in live.groups() {
        assert!(tree.contains(&LiveRef::Group(group)), "group {group} not mirrored");
    }
}
