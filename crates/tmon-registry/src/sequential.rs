//! Default registry with sequentially numbered names
//!
//! Provides [`SequentialRegistry`], shareable through `Arc` between the
//! shadow tree (the only writer) and renderers.

use crate::info::{Labeled, RegisteredInfo};
use crate::Registry;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::hash::Hash;

/// Registry naming entries `{Kind}-{seq}` with a global counter
///
/// Sequence numbers are never reused, so a removed key that shows up again
/// gets a fresh name.
#[derive(Debug)]
pub struct SequentialRegistry<K> {
    inner: Mutex<Inner<K>>,
}

#[derive(Debug)]
struct Inner<K> {
    entries: IndexMap<K, RegisteredInfo>,
    next_seq: u64,
}

impl<K> SequentialRegistry<K>
where
    K: Labeled + Eq + Hash + Clone,
{
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: IndexMap::new(),
                next_seq: 1,
            }),
        }
    }

    /// Snapshot of all live entries in registration order
    #[must_use]
    pub fn snapshot(&self) -> Vec<(K, RegisteredInfo)> {
        self.inner
            .lock()
            .entries
            .iter()
            .map(|(k, info)| (k.clone(), info.clone()))
            .collect()
    }
}

impl<K> Default for SequentialRegistry<K>
where
    K: Labeled + Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Registry<K> for SequentialRegistry<K>
where
    K: Labeled + Eq + Hash + Clone + Send,
{
    fn get_info(&self, key: &K) -> RegisteredInfo {
        let mut inner = self.inner.lock();
        if let Some(info) = inner.entries.get(key) {
            return info.clone();
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        let info = RegisteredInfo::new(key.kind(), seq);
        tracing::trace!(name = %info.name, "registered");
        inner.entries.insert(key.clone(), info.clone());
        info
    }

    fn peek(&self, key: &K) -> Option<RegisteredInfo> {
        self.inner.lock().entries.get(key).cloned()
    }

    fn remove(&self, key: &K) -> Option<RegisteredInfo> {
        // shift_remove keeps snapshot() in registration order
        let removed = self.inner.lock().entries.shift_remove(key);
        if let Some(info) = &removed {
            tracing::trace!(name = %info.name, "released");
        }
        removed
    }

    fn contains(&self, key: &K) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntityKind;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    enum Key {
        T(u32),
        G(u32),
    }

    impl Labeled for Key {
        fn kind(&self) -> EntityKind {
            match self {
                Key::T(_) => EntityKind::Task,
                Key::G(_) => EntityKind::Group,
            }
        }
    }

    #[test]
    fn registry_new_empty() {
        let registry = SequentialRegistry::<Key>::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn get_info_registers_lazily() {
        let registry = SequentialRegistry::new();
        assert!(!registry.contains(&Key::T(1)));

        let info = registry.get_info(&Key::T(1));
        assert_eq!(info.name, "Task-1");
        assert_eq!(info.kind, EntityKind::Task);
        assert!(registry.contains(&Key::T(1)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn name_is_stable_while_registered() {
        let registry = SequentialRegistry::new();
        let first = registry.get_name(&Key::G(3));
        registry.get_name(&Key::T(9));
        assert_eq!(registry.get_name(&Key::G(3)), first);
        assert_eq!(first, "Group-1");
    }

    #[test]
    fn remove_releases_and_never_reuses_seq() {
        let registry = SequentialRegistry::new();
        let before = registry.get_info(&Key::T(1));

        let removed = registry.remove(&Key::T(1)).unwrap();
        assert_eq!(removed, before);
        assert!(registry.is_empty());
        assert!(registry.remove(&Key::T(1)).is_none());

        let after = registry.get_info(&Key::T(1));
        assert_ne!(after.name, before.name);
        assert!(after.seq > before.seq);
    }

    #[test]
    fn peek_does_not_register() {
        let registry = SequentialRegistry::new();
        assert!(registry.peek(&Key::T(5)).is_none());
        assert!(registry.peek_name(&Key::T(5)).is_none());
        assert!(registry.is_empty());

        let name = registry.get_name(&Key::T(5));
        assert_eq!(registry.peek_name(&Key::T(5)), Some(name));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn snapshot_keeps_registration_order() {
        let registry = SequentialRegistry::new();
        registry.get_name(&Key::T(1));
        registry.get_name(&Key::G(1));
        registry.get_name(&Key::T(2));
        registry.remove(&Key::G(1));

        let names: Vec<String> = registry.snapshot().into_iter().map(|(_, i)| i.name).collect();
        assert_eq!(names, vec!["Task-1", "Task-3"]);
    }

    proptest! {
        #[test]
        fn prop_live_names_are_unique(ops in proptest::collection::vec((0..16u32, any::<bool>()), 0..200)) {
            let registry = SequentialRegistry::new();
            for (id, remove) in ops {
                let key = if id % 2 == 0 { Key::T(id) } else { Key::G(id) };
                if remove {
                    registry.remove(&key);
                } else {
                    registry.get_name(&key);
                }
            }

            let names: HashSet<String> = registry.snapshot().into_iter().map(|(_, i)| i.name).collect();
            prop_assert_eq!(names.len(), registry.len());
        }
    }
}
