//! Boundary with the live scheduler
//!
//! The shadow tree never owns scheduler entities. It only needs to read the
//! ordered child lists reachable from a reference.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use tmon_registry::{EntityKind, Labeled};

/// Read-only view of the scheduler's task / work-group hierarchy
///
/// Accessors must be side-effect free and cheap (O(1) or O(children)).
pub trait LiveHierarchy {
    /// Live task reference
    type Task: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    /// Live work-group reference
    type Group: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    /// Work-groups owned by `task`, in opening order
    fn child_groups(&self, task: Self::Task) -> Vec<Self::Group>;

    /// Tasks owned by `group`, in spawn order
    fn child_tasks(&self, group: Self::Group) -> Vec<Self::Task>;

    /// Work-group that spawned `task` (used for incremental add only)
    fn parent_group(&self, task: Self::Task) -> Option<Self::Group>;

    /// Task that opened `group` (used for incremental add only)
    fn group_owner(&self, group: Self::Group) -> Option<Self::Task>;
}

/// Tagged reference to either a task or a work-group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiveRef<T, G> {
    /// Live task
    Task(T),

    /// Live work-group
    Group(G),
}

/// Live reference type for hierarchy `H`
pub type RefOf<H> = LiveRef<<H as LiveHierarchy>::Task, <H as LiveHierarchy>::Group>;

impl<T, G> LiveRef<T, G> {
    /// Task reference, if this is a task
    #[inline]
    pub fn as_task(&self) -> Option<&T> {
        match self {
            Self::Task(t) => Some(t),
            Self::Group(_) => None,
        }
    }

    /// Work-group reference, if this is a work-group
    #[inline]
    pub fn as_group(&self) -> Option<&G> {
        match self {
            Self::Group(g) => Some(g),
            Self::Task(_) => None,
        }
    }

    /// Check if this references a work-group
    #[inline]
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }
}

impl<T, G> Labeled for LiveRef<T, G> {
    fn kind(&self) -> EntityKind {
        match self {
            Self::Task(_) => EntityKind::Task,
            Self::Group(_) => EntityKind::Group,
        }
    }
}

impl<T: fmt::Debug, G: fmt::Debug> fmt::Display for LiveRef<T, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task(t) => write!(f, "task {t:?}"),
            Self::Group(g) => write!(f, "group {g:?}"),
        }
    }
}
