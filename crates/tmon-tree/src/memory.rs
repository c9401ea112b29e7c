//! In-memory scheduler model
//!
//! [`MemoryHierarchy`] plays the role of the live scheduler for standalone
//! use: tests, the simulator and the CLI demo. It follows the same rules a
//! structured-concurrency runtime does:
//! - a task exits only after every work-group it opened has closed
//! - a work-group closes on its own when its last task exits, and nobody is
//!   told about it

use crate::error::LiveError;
use crate::live::LiveHierarchy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Live task handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub u32);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task:{}", self.0)
    }
}

/// Live work-group handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group:{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct TaskSlot {
    parent: Option<GroupId>,
    groups: Vec<GroupId>,
}

#[derive(Debug, Clone)]
struct GroupSlot {
    owner: TaskId,
    tasks: Vec<TaskId>,
}

/// Outcome of [`MemoryHierarchy::exit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskExit {
    /// Task that exited
    pub task: TaskId,
    /// Work-group that closed because this was its last task
    pub closed_group: Option<GroupId>,
}

/// Arena-backed live hierarchy with a single root task
#[derive(Debug, Clone)]
pub struct MemoryHierarchy {
    root: TaskId,
    tasks: BTreeMap<TaskId, TaskSlot>,
    groups: BTreeMap<GroupId, GroupSlot>,
    next_task: u32,
    next_group: u32,
}

impl MemoryHierarchy {
    /// Create a hierarchy holding only the root task
    #[must_use]
    pub fn new() -> Self {
        let root = TaskId(0);
        let mut tasks = BTreeMap::new();
        tasks.insert(
            root,
            TaskSlot {
                parent: None,
                groups: Vec::new(),
            },
        );
        Self {
            root,
            tasks,
            groups: BTreeMap::new(),
            next_task: 1,
            next_group: 1,
        }
    }

    /// Root task
    #[inline]
    #[must_use]
    pub fn root(&self) -> TaskId {
        self.root
    }

    /// Open a new, empty work-group owned by `task`
    ///
    /// # Errors
    /// Returns [`LiveError::UnknownTask`] if `task` is not running
    pub fn open_group(&mut self, task: TaskId) -> Result<GroupId, LiveError> {
        let slot = self.tasks.get_mut(&task).ok_or(LiveError::UnknownTask(task))?;
        let group = GroupId(self.next_group);
        self.next_group += 1;
        slot.groups.push(group);
        self.groups.insert(
            group,
            GroupSlot {
                owner: task,
                tasks: Vec::new(),
            },
        );
        Ok(group)
    }

    /// Spawn a new task into `group`
    ///
    /// # Errors
    /// Returns [`LiveError::UnknownGroup`] if `group` is closed
    pub fn spawn(&mut self, group: GroupId) -> Result<TaskId, LiveError> {
        let slot = self.groups.get_mut(&group).ok_or(LiveError::UnknownGroup(group))?;
        let task = TaskId(self.next_task);
        self.next_task += 1;
        slot.tasks.push(task);
        self.tasks.insert(
            task,
            TaskSlot {
                parent: Some(group),
                groups: Vec::new(),
            },
        );
        Ok(task)
    }

    /// Exit `task`, closing its parent work-group if it was the last member
    ///
    /// # Errors
    /// - [`LiveError::RootExit`] for the root task
    /// - [`LiveError::OpenGroups`] if the task still owns work-groups
    /// - [`LiveError::UnknownTask`] if the task is not running
    pub fn exit(&mut self, task: TaskId) -> Result<TaskExit, LiveError> {
        if task == self.root {
            return Err(LiveError::RootExit);
        }
        let slot = self.tasks.get(&task).ok_or(LiveError::UnknownTask(task))?;
        if !slot.groups.is_empty() {
            return Err(LiveError::OpenGroups {
                task,
                open: slot.groups.len(),
            });
        }
        let parent = slot.parent;
        self.tasks.remove(&task);

        let mut closed_group = None;
        if let Some(group) = parent {
            let now_empty = match self.groups.get_mut(&group) {
                Some(g) => {
                    g.tasks.retain(|t| *t != task);
                    g.tasks.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.detach_group(group);
                closed_group = Some(group);
            }
        }

        Ok(TaskExit { task, closed_group })
    }

    /// Exit `task`, then every ancestor task left owning no work-group
    ///
    /// Models tasks that finish as soon as their last work-group drains,
    /// which is how the shadow tree's upward cascade reads an empty
    /// parent. The root never exits. Returns one [`TaskExit`] per exited
    /// task, `task` first.
    ///
    /// # Errors
    /// Same as [`MemoryHierarchy::exit`] for `task` itself
    pub fn exit_unwinding(&mut self, task: TaskId) -> Result<Vec<TaskExit>, LiveError> {
        let mut exits = Vec::new();
        let mut current = task;
        loop {
            let owner = self
                .parent_group(current)
                .and_then(|g| self.group_owner(g));
            let exit = self.exit(current)?;
            exits.push(exit);

            match (exit.closed_group, owner) {
                (Some(_), Some(owner))
                    if owner != self.root && self.tasks.get(&owner).is_some_and(|s| s.groups.is_empty()) =>
                {
                    current = owner;
                }
                _ => return Ok(exits),
            }
        }
    }

    /// Close an empty work-group explicitly
    ///
    /// # Errors
    /// Returns [`LiveError::GroupNotEmpty`] while tasks are still running in it
    pub fn close_group(&mut self, group: GroupId) -> Result<(), LiveError> {
        let slot = self.groups.get(&group).ok_or(LiveError::UnknownGroup(group))?;
        if !slot.tasks.is_empty() {
            return Err(LiveError::GroupNotEmpty {
                group,
                live: slot.tasks.len(),
            });
        }
        self.detach_group(group);
        Ok(())
    }

    fn detach_group(&mut self, group: GroupId) {
        if let Some(slot) = self.groups.remove(&group) {
            if let Some(owner) = self.tasks.get_mut(&slot.owner) {
                owner.groups.retain(|g| *g != group);
            }
        }
    }

    /// Check if `task` is running
    #[inline]
    #[must_use]
    pub fn is_alive(&self, task: TaskId) -> bool {
        self.tasks.contains_key(&task)
    }

    /// Check if `group` is open
    #[inline]
    #[must_use]
    pub fn is_open(&self, group: GroupId) -> bool {
        self.groups.contains_key(&group)
    }

    /// Running tasks in id order
    #[must_use]
    pub fn tasks(&self) -> Vec<TaskId> {
        self.tasks.keys().copied().collect()
    }

    /// Open work-groups in id order
    #[must_use]
    pub fn groups(&self) -> Vec<GroupId> {
        self.groups.keys().copied().collect()
    }

    /// Running non-root tasks that own no work-group (allowed to exit)
    #[must_use]
    pub fn leaf_tasks(&self) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|(id, slot)| **id != self.root && slot.groups.is_empty())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Running task count, root included
    #[inline]
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Open work-group count
    #[inline]
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Total live entities (tasks plus work-groups)
    #[inline]
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.task_count() + self.group_count()
    }
}

impl Default for MemoryHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveHierarchy for MemoryHierarchy {
    type Task = TaskId;
    type Group = GroupId;

    fn child_groups(&self, task: TaskId) -> Vec<GroupId> {
        self.tasks
            .get(&task)
            .map(|slot| slot.groups.clone())
            .unwrap_or_default()
    }

    fn child_tasks(&self, group: GroupId) -> Vec<TaskId> {
        self.groups
            .get(&group)
            .map(|slot| slot.tasks.clone())
            .unwrap_or_default()
    }

    fn parent_group(&self, task: TaskId) -> Option<GroupId> {
        self.tasks.get(&task).and_then(|slot| slot.parent)
    }

    fn group_owner(&self, group: GroupId) -> Option<TaskId> {
        self.groups.get(&group).map(|slot| slot.owner)
    }
}
