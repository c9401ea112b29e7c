//! Registry entry types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of scheduler entity a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Unit of concurrently scheduled work
    Task,

    /// Scope owning a set of tasks (nursery)
    Group,
}

impl EntityKind {
    /// Name prefix used when minting display names
    #[inline]
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Task => "Task",
            Self::Group => "Group",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Keys that can report which kind of entity they reference
pub trait Labeled {
    /// Entity kind of this key
    fn kind(&self) -> EntityKind;
}

/// Metadata the registry keeps per live reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredInfo {
    /// Unique display name
    pub name: String,

    /// Entity kind
    pub kind: EntityKind,

    /// Registration sequence number (never reused)
    pub seq: u64,

    /// When the entry was created
    pub registered_at: DateTime<Utc>,
}

impl RegisteredInfo {
    /// Build info for a freshly minted entry
    #[must_use]
    pub fn new(kind: EntityKind, seq: u64) -> Self {
        Self {
            name: format!("{}-{seq}", kind.prefix()),
            kind,
            seq,
            registered_at: Utc::now(),
        }
    }
}
