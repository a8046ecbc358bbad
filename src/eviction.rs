//! Victim selection for trim passes

use crate::slots::EntryKey;
use std::cmp::Ordering;
use std::time::Instant;

/// An evictable entry offered to an [`EvictionStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub key: EntryKey,
    pub priority: i32,
    pub last_use_time: Instant,
    /// Registration order within the pool, lower is older.
    pub sequence: u64,
}

impl Candidate {
    /// Whether the entry was last used at or before `cutoff`.
    pub fn is_expired(&self, cutoff: Option<Instant>) -> bool {
        cutoff.is_some_and(|cutoff| self.last_use_time <= cutoff)
    }

    fn eviction_order(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then(self.last_use_time.cmp(&other.last_use_time))
            .then(self.sequence.cmp(&other.sequence))
    }
}

/// Chooses which candidates a trim pass evicts.
///
/// `requested` is the number of entries the pool wants gone to get back
/// within capacity. `expired_before` is the expiry cutoff, `None` when the
/// pool never expires entries. Keys that are not among `candidates` are
/// ignored by the pool.
pub trait EvictionStrategy {
    fn select(
        &self,
        candidates: &[Candidate],
        requested: usize,
        expired_before: Option<Instant>,
    ) -> Vec<EntryKey>;
}

impl<F> EvictionStrategy for F
where
    F: Fn(&[Candidate], usize, Option<Instant>) -> Vec<EntryKey>,
{
    fn select(
        &self,
        candidates: &[Candidate],
        requested: usize,
        expired_before: Option<Instant>,
    ) -> Vec<EntryKey> {
        self(candidates, requested, expired_before)
    }
}

/// Default two-phase selection.
///
/// Every expired candidate goes first, whatever the quota. What is left of
/// the quota is then filled with the lowest priority candidates, older
/// last use and then earlier registration breaking ties.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{Candidate, EvictionStrategy, PriorityExpiry};
/// # use esox_resourcepool::{Pool, PoolConfiguration, Poolable};
/// # struct Shell;
/// # impl Poolable for Shell {}
/// # let mut pool = Pool::new("", PoolConfiguration::new()).unwrap();
/// # let low = pool.register(Shell, false);
/// # let high = pool.register(Shell, false);
/// # pool.set_entry_priority(high, 9).unwrap();
/// let candidates: Vec<Candidate> = pool.candidates();
/// let victims = PriorityExpiry.select(&candidates, 1, None);
/// assert_eq!(victims, vec![low]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityExpiry;

impl EvictionStrategy for PriorityExpiry {
    fn select(
        &self,
        candidates: &[Candidate],
        requested: usize,
        expired_before: Option<Instant>,
    ) -> Vec<EntryKey> {
        if requested == 0 && expired_before.is_none() {
            return Vec::new();
        }

        let (expired, mut remaining): (Vec<&Candidate>, Vec<&Candidate>) = candidates
            .iter()
            .partition(|candidate| candidate.is_expired(expired_before));

        let mut victims: Vec<EntryKey> = expired.iter().map(|candidate| candidate.key).collect();

        let quota = requested.saturating_sub(victims.len()).min(remaining.len());
        if quota > 0 {
            remaining.sort_by(|a, b| a.eviction_order(b));
            victims.extend(remaining.iter().take(quota).map(|candidate| candidate.key));
        }

        victims
    }
}
