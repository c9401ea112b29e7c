//! Notification handling against a live in-memory hierarchy

use pretty_assertions::assert_eq;
use tmon_monitor::{render_text, MonitorConfig, MonitorError, MonitorState, Outcome, TreeMonitor};
use tmon_registry::Registry;
use tmon_test_utils::{
    assert_mirrors, assert_oracle_agreement, assert_tree_consistent, sample_hierarchy, shared_registry, MemRef,
};
use tmon_tree::{LiveHierarchy, LiveRef, MemoryHierarchy, SharedRegistry, TaskId};

fn quiet() -> MonitorConfig {
    MonitorConfig {
        print_task_tree: false,
        ..MonitorConfig::default()
    }
    .without_log_file()
}

fn started(live: &MemoryHierarchy) -> TreeMonitor<MemoryHierarchy> {
    let mut monitor = TreeMonitor::new(quiet());
    monitor.start(live, live.root()).unwrap();
    monitor
}

#[test]
fn sample_scenario_through_notifications() {
    let (mut live, s) = sample_hierarchy();
    let mut monitor = started(&live);
    let tree = monitor.tree().unwrap();
    assert_eq!(tree.len(), 4);
    assert_eq!(render_text(tree), "Task-1\n  Group-2\n    Task-3\n    Task-4\n");

    live.exit(s.t1).unwrap();
    assert_eq!(monitor.on_task_exited(s.t1).unwrap(), Outcome::Removed(1));
    assert!(monitor.tree().unwrap().contains(&LiveRef::Group(s.g1)));

    live.exit(s.t2).unwrap();
    assert_eq!(monitor.on_task_exited(s.t2).unwrap(), Outcome::Removed(2));

    let tree = monitor.tree().unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(render_text(tree), "Task-1\n");
    assert_tree_consistent(tree);
    assert_mirrors(tree, &live);
}

#[test]
fn spawns_into_new_and_existing_groups() {
    let (mut live, s) = sample_hierarchy();
    let mut monitor = started(&live);

    let t3 = live.spawn(s.g1).unwrap();
    monitor.on_task_spawned(&live, t3).unwrap();

    let g2 = live.open_group(t3).unwrap();
    let t4 = live.spawn(g2).unwrap();
    monitor.on_task_spawned(&live, t4).unwrap();

    let tree = monitor.tree().unwrap();
    assert_eq!(tree.lookup_parent(&LiveRef::Task(t4)), Some(LiveRef::Group(g2)));
    assert_eq!(tree.lookup_parent(&LiveRef::Group(g2)), Some(LiveRef::Task(t3)));
    assert_eq!(tree.parent_group(t3), Some(s.g1));
    assert_mirrors(tree, &live);
    assert_oracle_agreement(tree, &live);
    assert!(monitor.verify(&live).unwrap().passed());
}

#[test]
fn verify_reports_drift_from_live() {
    let (mut live, s) = sample_hierarchy();
    let monitor = started(&live);

    // the scheduler lost t1 without telling the monitor
    live.exit(s.t1).unwrap();
    let report = monitor.verify(&live).unwrap();
    assert_eq!(report.checked, 4);
    assert!(!report.passed());
    assert!(report
        .mismatches
        .iter()
        .any(|m| m.live == LiveRef::Task(s.t1)));
}

#[test]
fn spawn_without_mirrored_owner_poisons() {
    let (mut live, s) = sample_hierarchy();
    let mut monitor = started(&live);

    // t3 is never announced, so its group has no owner node
    let t3 = live.spawn(s.g1).unwrap();
    let g2 = live.open_group(t3).unwrap();
    let t4 = live.spawn(g2).unwrap();

    let err = monitor.on_task_spawned(&live, t4).unwrap_err();
    assert!(matches!(err, MonitorError::Tree(_)));
    assert!(matches!(monitor.state(), MonitorState::Poisoned { .. }));
    assert!(matches!(
        monitor.on_task_spawned(&live, t3),
        Err(MonitorError::Poisoned { .. })
    ));
}

#[test]
fn repeated_exit_is_ignored() {
    let (mut live, s) = sample_hierarchy();
    let mut monitor = started(&live);

    live.exit(s.t1).unwrap();
    monitor.on_task_exited(s.t1).unwrap();
    assert_eq!(monitor.on_task_exited(s.t1).unwrap(), Outcome::Ignored);
    assert_eq!(monitor.on_task_exited(TaskId(500)).unwrap(), Outcome::Ignored);
    assert!(monitor.is_trusted());
    assert_eq!(monitor.stats().ignored, 2);
}

#[test]
fn shared_registry_names_follow_removals() {
    let (mut live, s) = sample_hierarchy();
    let registry = shared_registry();
    let shared: SharedRegistry<MemRef> = registry.clone();
    let mut monitor = TreeMonitor::with_registry(quiet(), shared);
    monitor.start(&live, live.root()).unwrap();

    assert_eq!(registry.len(), 4);
    assert_eq!(registry.get_name(&LiveRef::Task(s.t2)), "Task-4");

    live.exit(s.t1).unwrap();
    live.exit(s.t2).unwrap();
    monitor.on_task_exited(s.t1).unwrap();
    monitor.on_task_exited(s.t2).unwrap();

    assert_eq!(registry.len(), 1);
    assert!(!registry.contains(&LiveRef::Group(s.g1)));
}

#[test]
fn parent_group_matches_live_for_every_task() {
    let live = tmon_test_utils::random_hierarchy(11, 30);
    let monitor = started(&live);
    let tree = monitor.tree().unwrap();
    for task in live.tasks() {
        assert_eq!(tree.parent_group(task), live.parent_group(task));
    }
}
