//! Scheduler notification handler
//!
//! [`TreeMonitor`] turns "task spawned" / "task exited" notifications into
//! shadow tree mutations. Once any tree invariant breaks the monitor is
//! poisoned: it logs the failure and rejects every later notification
//! instead of mutating a tree it can no longer trust.

use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::render::render_text;
use serde::Serialize;
use std::sync::Arc;
use tmon_registry::SequentialRegistry;
use tmon_tree::{LiveHierarchy, LiveRef, NodeId, OracleMismatch, RefOf, ShadowTree, SharedRegistry};

/// Lifecycle of a monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorState {
    /// Waiting for `start`
    Idle,

    /// Mirroring notifications
    Tracking,

    /// Stopped after a tree failure
    Poisoned {
        /// Failure message
        reason: String,
    },
}

/// What a notification did to the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// New task mirrored at this node
    Mirrored(NodeId),

    /// Nodes dropped, including emptied ancestors
    Removed(usize),

    /// Notification for a task the tree never mirrored
    Ignored,
}

/// Running counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonitorStats {
    /// Spawn notifications mirrored
    pub spawned: u64,
    /// Exit notifications applied
    pub exited: u64,
    /// Exit notifications for unknown tasks
    pub ignored: u64,
    /// Nodes dropped by removals
    pub removed_nodes: u64,
}

/// Result of cross-checking every mirrored node against the live hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleReport<K> {
    /// Nodes checked
    pub checked: usize,
    /// Nodes whose parents disagree
    pub mismatches: Vec<OracleMismatch<K>>,
}

impl<K> OracleReport<K> {
    /// Check if the mirror agreed with the live hierarchy everywhere
    #[inline]
    #[must_use]
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Notification handler owning one shadow tree
pub struct TreeMonitor<H: LiveHierarchy> {
    config: MonitorConfig,
    registry: SharedRegistry<RefOf<H>>,
    tree: Option<ShadowTree<H>>,
    state: MonitorState,
    stats: MonitorStats,
}

impl<H: LiveHierarchy> TreeMonitor<H> {
    /// Create a monitor with its own registry
    #[must_use]
    pub fn new(config: MonitorConfig) -> Self {
        Self::with_registry(config, Arc::new(SequentialRegistry::<RefOf<H>>::new()))
    }

    /// Create a monitor sharing `registry` with other consumers
    #[must_use]
    pub fn with_registry(config: MonitorConfig, registry: SharedRegistry<RefOf<H>>) -> Self {
        Self {
            config,
            registry,
            tree: None,
            state: MonitorState::Idle,
            stats: MonitorStats::default(),
        }
    }

    /// Mirror the live hierarchy below `root`
    ///
    /// A monitor mirrors one tree for its whole life; the registry it
    /// shares would otherwise keep entries of the first tree forever.
    ///
    /// # Errors
    /// - [`MonitorError::AlreadyStarted`] if a tree is already mirrored
    /// - [`MonitorError::Poisoned`] if an earlier failure occurred
    /// - [`MonitorError::Tree`] (and poisons) if the build fails
    pub fn start(&mut self, hierarchy: &H, root: H::Task) -> Result<(), MonitorError> {
        self.ensure_not_poisoned()?;
        if self.tree.is_some() {
            return Err(MonitorError::AlreadyStarted);
        }
        let built = ShadowTree::build(hierarchy, root, Some(Arc::clone(&self.registry)));
        let tree = self.trust(built)?;
        tracing::info!(nodes = tree.len(), "monitoring started");
        self.tree = Some(tree);
        self.state = MonitorState::Tracking;
        self.print_tree();
        Ok(())
    }

    /// Handle a "task spawned" notification
    ///
    /// # Errors
    /// - [`MonitorError::NotStarted`] before `start`
    /// - [`MonitorError::Poisoned`] after an earlier failure
    /// - [`MonitorError::Tree`] on a double notification or missing parent
    pub fn on_task_spawned(&mut self, hierarchy: &H, task: H::Task) -> Result<Outcome, MonitorError> {
        self.ensure_not_poisoned()?;
        let attached = self.tree_mut()?.attach_task(hierarchy, task);
        let node = self.trust(attached)?;

        self.stats.spawned += 1;
        tracing::debug!(?task, %node, "task spawned");
        self.print_tree();
        Ok(Outcome::Mirrored(node))
    }

    /// Handle a "task exited" notification
    ///
    /// Exits of tasks that were never mirrored are logged and ignored.
    ///
    /// # Errors
    /// - [`MonitorError::NotStarted`] before `start`
    /// - [`MonitorError::Poisoned`] after an earlier failure
    /// - [`MonitorError::Tree`] if the tree and its indexes disagree
    pub fn on_task_exited(&mut self, task: H::Task) -> Result<Outcome, MonitorError> {
        self.ensure_not_poisoned()?;
        let removal = self.tree_mut()?.remove_ref(&LiveRef::Task(task));

        match self.trust(removal)? {
            Some(removed) => {
                self.stats.exited += 1;
                self.stats.removed_nodes += removed.len() as u64;
                tracing::debug!(?task, removed = removed.len(), "task exited");
                self.print_tree();
                Ok(Outcome::Removed(removed.len()))
            }
            None => {
                self.stats.ignored += 1;
                tracing::warn!(?task, "exit of unmirrored task ignored");
                Ok(Outcome::Ignored)
            }
        }
    }

    /// Cross-check every mirrored node against the live hierarchy
    ///
    /// # Errors
    /// Returns [`MonitorError::NotStarted`] before `start`
    pub fn verify(&self, hierarchy: &H) -> Result<OracleReport<RefOf<H>>, MonitorError> {
        let tree = self.tree.as_ref().ok_or(MonitorError::NotStarted)?;
        let mismatches = tree.oracle_mismatches(hierarchy);
        if !mismatches.is_empty() {
            tracing::warn!(count = mismatches.len(), "shadow tree disagrees with live hierarchy");
        }
        Ok(OracleReport {
            checked: tree.len(),
            mismatches,
        })
    }

    fn ensure_not_poisoned(&self) -> Result<(), MonitorError> {
        match &self.state {
            MonitorState::Poisoned { reason } => Err(MonitorError::Poisoned {
                reason: reason.clone(),
            }),
            _ => Ok(()),
        }
    }

    fn tree_mut(&mut self) -> Result<&mut ShadowTree<H>, MonitorError> {
        self.tree.as_mut().ok_or(MonitorError::NotStarted)
    }

    /// Poison on any tree failure; there is no local repair
    fn trust<T>(&mut self, result: Result<T, tmon_tree::TreeError>) -> Result<T, MonitorError> {
        result.map_err(|e| {
            tracing::error!(error = %e, "shadow tree invariant violated, monitoring stopped");
            self.state = MonitorState::Poisoned {
                reason: e.to_string(),
            };
            MonitorError::Tree(e)
        })
    }

    fn print_tree(&self) {
        if let (true, Some(tree)) = (self.config.print_task_tree, self.tree.as_ref()) {
            tracing::info!("task tree:\n{}", render_text(tree));
        }
    }

    /// Current state
    #[inline]
    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Check if the tree can still be trusted
    #[inline]
    #[must_use]
    pub fn is_trusted(&self) -> bool {
        self.state == MonitorState::Tracking
    }

    /// The mirrored tree, once started
    #[inline]
    #[must_use]
    pub fn tree(&self) -> Option<&ShadowTree<H>> {
        self.tree.as_ref()
    }

    /// Registry shared with the tree
    #[inline]
    pub fn registry(&self) -> &SharedRegistry<RefOf<H>> {
        &self.registry
    }

    /// Running counters
    #[inline]
    #[must_use]
    pub fn stats(&self) -> MonitorStats {
        self.stats
    }

    /// Configuration in use
    #[inline]
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }
}
