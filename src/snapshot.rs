//! Read-only diagnostic views of pools and their entries

use crate::slots::EntryKey;
use std::time::{Duration, Instant};

/// State of one pooled entry at the time it was taken.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{Pool, PoolConfiguration, Poolable};
///
/// struct Shell;
/// impl Poolable for Shell {
///     fn name(&self) -> &str {
///         "shell"
///     }
/// }
///
/// let mut pool = Pool::new("", PoolConfiguration::new()).unwrap();
/// let key = pool.register(Shell, true);
///
/// let snapshot = pool.entry_snapshot(key).unwrap();
/// assert_eq!(snapshot.name, "shell");
/// assert!(snapshot.is_in_use());
/// assert!(!snapshot.is_evictable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EntrySnapshot {
    pub key: EntryKey,
    pub name: String,
    pub locked: bool,
    pub custom_releasable: bool,
    pub priority: i32,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub last_use_time: Instant,
    /// Time since last use, measured when the snapshot was taken
    pub idle_for: Duration,
    pub borrow_count: u32,
}

impl EntrySnapshot {
    pub fn is_in_use(&self) -> bool {
        self.borrow_count > 0
    }

    /// Whether a trim pass may evict this entry.
    pub fn is_evictable(&self) -> bool {
        !self.is_in_use() && !self.locked && self.custom_releasable
    }
}

/// Pool-level figures.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolSnapshot {
    /// Type name of the pooled resource
    pub kind: &'static str,
    pub name: String,
    pub entries: usize,
    pub in_use_entries: usize,
    pub evictable_entries: usize,
    pub capacity: Option<usize>,
    pub expire_after: Option<Duration>,
    pub auto_release_interval: Option<Duration>,
    pub priority: i32,
    pub allow_multi_borrow: bool,
}

impl PoolSnapshot {
    /// Entries above capacity that trimming could not remove.
    pub fn overflow(&self) -> usize {
        self.capacity
            .map_or(0, |capacity| self.entries.saturating_sub(capacity))
    }
}
