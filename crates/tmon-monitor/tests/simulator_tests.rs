//! Seeded simulator runs

use proptest::prelude::*;
use tmon_monitor::simulator::{run_simulator, OperationDistribution, SimulatorConfig};

#[test]
fn several_seeds_pass() {
    for seed in [1, 2, 3, 42, 1234] {
        let report = run_simulator(SimulatorConfig {
            seed,
            total_operations: 400,
            ..SimulatorConfig::default()
        });
        assert!(report.passed(), "seed {seed}:\n{}", report.generate_text());
    }
}

#[test]
fn spawn_heavy_workload_respects_task_cap() {
    let report = run_simulator(SimulatorConfig {
        seed: 9,
        total_operations: 500,
        max_live_tasks: 16,
        operation_distribution: OperationDistribution {
            spawn_into: 0.6,
            spawn_fresh: 0.4,
            exit: 0.0,
            stale_exit: 0.0,
        },
        ..SimulatorConfig::default()
    });
    assert!(report.passed(), "{}", report.generate_text());
    assert!(report.final_task_count <= 16);
    assert!(report.stats.operations_by_type.contains_key("exit"));
}

#[test]
fn sparse_verification_still_checks_at_end() {
    let report = run_simulator(SimulatorConfig {
        seed: 5,
        total_operations: 95,
        verify_every: 10,
        ..SimulatorConfig::default()
    });
    assert!(report.passed());
    assert_eq!(report.stats.checks_run, 10);
}

#[test]
fn report_serializes_to_json() {
    let report = run_simulator(SimulatorConfig {
        total_operations: 50,
        ..SimulatorConfig::default()
    });
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["config"]["seed"], 42);
    assert_eq!(json["violations"].as_array().map(Vec::len), Some(0));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_any_seed_passes(seed in any::<u64>(), ops in 1..300u64) {
        let report = run_simulator(SimulatorConfig {
            seed,
            total_operations: ops,
            ..SimulatorConfig::default()
        });
        prop_assert!(report.passed(), "{}", report.generate_text());
        prop_assert_eq!(report.final_node_count, report.final_task_count + report.final_group_count);
    }
}
