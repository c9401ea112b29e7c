//! Shadow tree simulator
//!
//! Drives a [`TreeMonitor`] with a seeded random workload against a
//! [`MemoryHierarchy`] and checks the mirror after every operation.
//!
//! # Checks
//!
//! - the tree passes its own consistency check
//! - every mirrored node's parent agrees with the live-hierarchy oracle
//! - the mirror holds exactly the live entities
//! - the incrementally maintained tree has the same shape as a tree built
//!   from scratch

use crate::config::MonitorConfig;
use crate::monitor::{MonitorStats, Outcome, TreeMonitor};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::fmt::Write;
use tmon_tree::{GroupId, MemoryHierarchy, ShadowTree, TaskId};

/// Most recent exited tasks kept as stale-exit candidates
const STALE_EXIT_WINDOW: usize = 64;

/// Simulator configuration
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Total operations to execute
    pub total_operations: u64,
    /// Running tasks above which only exits are generated
    pub max_live_tasks: usize,
    /// Stop at the first violation
    pub stop_on_first_violation: bool,
    /// Relative operation weights
    pub operation_distribution: OperationDistribution,
    /// Run the full checks every N operations (1 checks after each)
    pub verify_every: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            total_operations: 1_000,
            max_live_tasks: 64,
            stop_on_first_violation: true,
            operation_distribution: OperationDistribution::default(),
            verify_every: 1,
        }
    }
}

/// Relative weights of generated operations
#[derive(Debug, Clone, Serialize)]
pub struct OperationDistribution {
    /// Spawn into an already open work-group
    pub spawn_into: f64,
    /// Open a work-group and spawn its first task
    pub spawn_fresh: f64,
    /// Exit a task that owns no work-group
    pub exit: f64,
    /// Repeat the exit notification of a task that is already gone
    pub stale_exit: f64,
}

impl Default for OperationDistribution {
    fn default() -> Self {
        Self {
            spawn_into: 0.35,
            spawn_fresh: 0.20,
            exit: 0.40,
            stale_exit: 0.05,
        }
    }
}

/// All operations the simulator can generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SimulatedOperation {
    /// Spawn a task into an open work-group
    SpawnInto(GroupId),
    /// Open a work-group under a task and spawn into it
    SpawnFresh(TaskId),
    /// Exit a leaf task
    Exit(TaskId),
    /// Exit notification for a task that already exited
    StaleExit(TaskId),
}

impl SimulatedOperation {
    fn label(&self) -> &'static str {
        match self {
            Self::SpawnInto(_) => "spawn_into",
            Self::SpawnFresh(_) => "spawn_fresh",
            Self::Exit(_) => "exit",
            Self::StaleExit(_) => "stale_exit",
        }
    }
}

/// Types of invariant checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InvariantCheck {
    /// Tree, reverse index and name index agree
    TreeConsistent,
    /// Shadow parents match the live hierarchy
    OracleAgrees,
    /// Mirrored entity count matches the live count
    MirrorsLiveEntities,
    /// Incremental tree has the same shape as a rebuild
    MatchesRebuild,
}

/// A violation detected during simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Violation {
    /// Monitor returned an error
    Rejected {
        /// Operation index
        operation_index: u64,
        /// Operation that failed
        operation: SimulatedOperation,
        /// Error message
        error: String,
    },

    /// Monitor succeeded with the wrong outcome
    UnexpectedOutcome {
        /// Operation index
        operation_index: u64,
        /// Operation that misbehaved
        operation: SimulatedOperation,
        /// What the model expected
        expected: String,
        /// What the monitor reported
        actual: String,
    },

    /// A post-operation check failed
    Invariant {
        /// Operation index
        operation_index: u64,
        /// Failed check
        check: InvariantCheck,
        /// Failure details
        details: String,
    },
}

/// Statistics collected during simulation
#[derive(Debug, Clone, Default, Serialize)]
pub struct OperationStats {
    /// Operations executed
    pub total_operations: u64,
    /// Operations per kind
    pub operations_by_type: BTreeMap<String, u64>,
    /// Check rounds run
    pub checks_run: u64,
    /// Deepest tree seen (root is 0)
    pub max_depth: usize,
    /// Largest tree seen
    pub max_nodes: usize,
}

impl OperationStats {
    fn record(&mut self, operation: &SimulatedOperation) {
        self.total_operations += 1;
        *self
            .operations_by_type
            .entry(operation.label().to_string())
            .or_insert(0) += 1;
    }
}

/// Final report from the simulator
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Configuration that produced this run
    pub config: SimulatorConfig,
    /// Workload statistics
    pub stats: OperationStats,
    /// Counters kept by the monitor
    pub monitor: MonitorStats,
    /// Violations found
    pub violations: Vec<Violation>,
    /// Running tasks at the end
    pub final_task_count: usize,
    /// Open work-groups at the end
    pub final_group_count: usize,
    /// Mirrored nodes at the end
    pub final_node_count: usize,
}

impl SimulationReport {
    /// Check if simulation passed all criteria
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate a text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();
        let _ = writeln!(report, "=== TMON Simulator Report ===\n");
        let _ = writeln!(report, "Seed: {}", self.config.seed);
        let _ = writeln!(report, "Total Operations: {}", self.stats.total_operations);
        for (kind, count) in &self.stats.operations_by_type {
            let _ = writeln!(report, "  {kind}: {count}");
        }
        let _ = writeln!(report, "Check Rounds: {}", self.stats.checks_run);
        let _ = writeln!(report, "Max Depth: {}", self.stats.max_depth);
        let _ = writeln!(report, "Max Nodes: {}", self.stats.max_nodes);
        let _ = writeln!(report, "Nodes Removed: {}", self.monitor.removed_nodes);
        let _ = writeln!(report, "Violations: {}", self.violations.len());
        let _ = writeln!(
            report,
            "Final: {} tasks, {} groups, {} nodes",
            self.final_task_count, self.final_group_count, self.final_node_count
        );

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                let _ = writeln!(report, "{}. {v:?}", i + 1);
            }
        }

        let _ = writeln!(
            report,
            "\n=== Result: {} ===",
            if self.passed() { "PASS" } else { "FAIL" }
        );
        report
    }
}

/// Run the simulator
#[must_use]
pub fn run_simulator(config: SimulatorConfig) -> SimulationReport {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut live = MemoryHierarchy::new();
    let mut monitor = TreeMonitor::new(MonitorConfig {
        print_task_tree: false,
        ..MonitorConfig::default()
    });
    let mut stats = OperationStats::default();
    let mut violations = Vec::new();
    let mut exited: VecDeque<TaskId> = VecDeque::with_capacity(STALE_EXIT_WINDOW);

    tracing::info!(seed = config.seed, operations = config.total_operations, "simulation started");

    if let Err(e) = monitor.start(&live, live.root()) {
        violations.push(Violation::Invariant {
            operation_index: 0,
            check: InvariantCheck::TreeConsistent,
            details: e.to_string(),
        });
    }

    for i in 0..config.total_operations {
        if config.stop_on_first_violation && !violations.is_empty() {
            break;
        }

        let operation = generate_operation(&mut rng, &config, &live, &exited);
        if let Some(v) = execute_operation(i, operation, &mut live, &mut monitor, &mut exited) {
            tracing::warn!(operation_index = i, ?operation, "simulation violation");
            violations.push(v);
        }
        stats.record(&operation);

        let last = i + 1 == config.total_operations;
        if (i + 1) % config.verify_every.max(1) == 0 || last {
            stats.checks_run += 1;
            violations.extend(check_all(i, &live, &monitor, &mut stats));
        }
    }

    let final_node_count = monitor.tree().map_or(0, ShadowTree::len);
    tracing::info!(
        violations = violations.len(),
        nodes = final_node_count,
        "simulation finished"
    );

    SimulationReport {
        config,
        stats,
        monitor: monitor.stats(),
        violations,
        final_task_count: live.task_count(),
        final_group_count: live.group_count(),
        final_node_count,
    }
}

/// Pick an operation the live model can carry out
fn generate_operation(
    rng: &mut StdRng,
    config: &SimulatorConfig,
    live: &MemoryHierarchy,
    exited: &VecDeque<TaskId>,
) -> SimulatedOperation {
    let leaves = live.leaf_tasks();
    if live.task_count() >= config.max_live_tasks && !leaves.is_empty() {
        return SimulatedOperation::Exit(leaves[rng.gen_range(0..leaves.len())]);
    }

    let d = &config.operation_distribution;
    let total = d.spawn_into + d.spawn_fresh + d.exit + d.stale_exit;
    let r: f64 = rng.gen::<f64>() * total;

    let groups = live.groups();
    if r < d.spawn_into && !groups.is_empty() {
        return SimulatedOperation::SpawnInto(groups[rng.gen_range(0..groups.len())]);
    }
    if r >= d.spawn_into + d.spawn_fresh && r < d.spawn_into + d.spawn_fresh + d.exit && !leaves.is_empty() {
        return SimulatedOperation::Exit(leaves[rng.gen_range(0..leaves.len())]);
    }
    if r >= d.spawn_into + d.spawn_fresh + d.exit && !exited.is_empty() {
        return SimulatedOperation::StaleExit(exited[rng.gen_range(0..exited.len())]);
    }

    let tasks = live.tasks();
    SimulatedOperation::SpawnFresh(tasks[rng.gen_range(0..tasks.len())])
}

/// Apply `operation` to the live model, notify the monitor and compare
fn execute_operation(
    index: u64,
    operation: SimulatedOperation,
    live: &mut MemoryHierarchy,
    monitor: &mut TreeMonitor<MemoryHierarchy>,
    exited: &mut VecDeque<TaskId>,
) -> Option<Violation> {
    let (expected, result) = match operation {
        SimulatedOperation::SpawnInto(group) => {
            let task = live.spawn(group).ok()?;
            ("mirrored".to_string(), monitor.on_task_spawned(live, task))
        }
        SimulatedOperation::SpawnFresh(owner) => {
            let group = live.open_group(owner).ok()?;
            let task = live.spawn(group).ok()?;
            ("mirrored".to_string(), monitor.on_task_spawned(live, task))
        }
        SimulatedOperation::Exit(task) => {
            let exits = live.exit_unwinding(task).ok()?;
            let count: usize = exits
                .iter()
                .map(|e| 1 + usize::from(e.closed_group.is_some()))
                .sum();
            for exit in exits {
                remember_exit(exited, exit.task);
            }
            (format!("removed {count}"), monitor.on_task_exited(task))
        }
        SimulatedOperation::StaleExit(task) => ("ignored".to_string(), monitor.on_task_exited(task)),
    };

    let actual = match result {
        Ok(Outcome::Mirrored(_)) => "mirrored".to_string(),
        Ok(Outcome::Removed(n)) => format!("removed {n}"),
        Ok(Outcome::Ignored) => "ignored".to_string(),
        Err(e) => {
            return Some(Violation::Rejected {
                operation_index: index,
                operation,
                error: e.to_string(),
            })
        }
    };

    (actual != expected).then_some(Violation::UnexpectedOutcome {
        operation_index: index,
        operation,
        expected,
        actual,
    })
}

fn check_all(
    index: u64,
    live: &MemoryHierarchy,
    monitor: &TreeMonitor<MemoryHierarchy>,
    stats: &mut OperationStats,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let Some(tree) = monitor.tree() else {
        return violations;
    };
    let mut fail = |check, details: String| {
        violations.push(Violation::Invariant {
            operation_index: index,
            check,
            details,
        });
    };

    stats.max_nodes = stats.max_nodes.max(tree.len());
    stats.max_depth = stats
        .max_depth
        .max(tree.walk().map(|e| e.depth).max().unwrap_or(0));

    if let Err(e) = tree.check_consistency() {
        fail(InvariantCheck::TreeConsistent, e.to_string());
    }

    let mismatches = tree.oracle_mismatches(live);
    if let Some(first) = mismatches.first() {
        fail(
            InvariantCheck::OracleAgrees,
            format!("{} mismatches, first: {first:?}", mismatches.len()),
        );
    }

    if tree.len() != live.entity_count() {
        fail(
            InvariantCheck::MirrorsLiveEntities,
            format!("{} nodes for {} live entities", tree.len(), live.entity_count()),
        );
    }

    match ShadowTree::build(live, live.root(), None) {
        Ok(rebuilt) => {
            if let Some(diff) = tree.first_divergence(&rebuilt) {
                fail(InvariantCheck::MatchesRebuild, format!("{diff:?}"));
            }
        }
        Err(e) => fail(InvariantCheck::MatchesRebuild, format!("rebuild failed: {e}")),
    }

    violations
}

/// Keep `task` as a stale-exit candidate, dropping the oldest past the window
fn remember_exit(exited: &mut VecDeque<TaskId>, task: TaskId) {
    if exited.len() == STALE_EXIT_WINDOW {
        exited.pop_front();
    }
    exited.push_back(task);
}
