//! Core resource pool implementation

use crate::category::CategoryKey;
use crate::clock::{Clock, SystemClock};
use crate::config::PoolConfiguration;
use crate::errors::{PoolError, PoolResult};
use crate::eviction::{Candidate, EvictionStrategy, PriorityExpiry};
use crate::metrics::{MetricsExporter, MetricsTracker, PoolMetrics};
use crate::resource::Poolable;
use crate::slots::{EntryKey, Slots};
use crate::snapshot::{EntrySnapshot, PoolSnapshot};

use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Bookkeeping for one pooled resource
struct Entry<T> {
    resource: T,
    name: String,
    locked: bool,
    priority: i32,
    last_use_time: Instant,
    sequence: u64,
    borrow_count: u32,
}

impl<T: Poolable> Entry<T> {
    fn is_in_use(&self) -> bool {
        self.borrow_count > 0
    }

    fn is_evictable(&self) -> bool {
        !self.is_in_use() && !self.locked && self.resource.can_release()
    }

    fn snapshot(&self, key: EntryKey, now: Instant) -> EntrySnapshot {
        EntrySnapshot {
            key,
            name: self.name.clone(),
            locked: self.locked,
            custom_releasable: self.resource.can_release(),
            priority: self.priority,
            last_use_time: self.last_use_time,
            idle_for: now.saturating_duration_since(self.last_use_time),
            borrow_count: self.borrow_count,
        }
    }
}

/// Named pool of interchangeable resources of one type.
///
/// Borrowers hold the [`EntryKey`] returned by [`borrow`](Self::borrow) and
/// hand it back through [`return_entry`](Self::return_entry). The pool never
/// evicts an entry while it is borrowed.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{Pool, PoolConfiguration, Poolable};
///
/// struct Bullet;
/// impl Poolable for Bullet {
///     fn name(&self) -> &str {
///         "bullet"
///     }
/// }
///
/// let mut pool = Pool::new("player", PoolConfiguration::new().with_capacity(8)).unwrap();
/// pool.register(Bullet, false);
///
/// let key = pool.borrow("bullet").unwrap();
/// assert!(!pool.can_borrow("bullet"));
///
/// pool.return_entry(key).unwrap();
/// assert!(pool.can_borrow("bullet"));
/// ```
pub struct Pool<T: Poolable> {
    category: CategoryKey,
    config: PoolConfiguration,
    entries: Slots<Entry<T>>,
    by_name: HashMap<String, SmallVec<[EntryKey; 4]>>,
    release_timer: Duration,
    next_sequence: u64,
    clock: Arc<dyn Clock>,
    metrics: MetricsTracker,
}

impl<T: Poolable> Pool<T> {
    /// Create a pool using the system clock
    pub fn new(name: impl Into<String>, config: PoolConfiguration) -> PoolResult<Self> {
        Self::with_clock(name, config, Arc::new(SystemClock))
    }

    /// Create a pool reading time from `clock`
    pub fn with_clock(
        name: impl Into<String>,
        config: PoolConfiguration,
        clock: Arc<dyn Clock>,
    ) -> PoolResult<Self> {
        config.validate()?;

        let category = CategoryKey::new::<T>(name);
        debug!("Created pool {} with {:?}", category, config);

        Ok(Self {
            category,
            config,
            entries: Slots::new(),
            by_name: HashMap::new(),
            release_timer: Duration::ZERO,
            next_sequence: 0,
            clock,
            metrics: MetricsTracker::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.category.name
    }

    pub fn category(&self) -> &CategoryKey {
        &self.category
    }

    pub fn config(&self) -> &PoolConfiguration {
        &self.config
    }

    /// Number of pooled entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn in_use_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.is_in_use())
            .count()
    }

    /// Number of entries a trim pass could evict right now
    pub fn evictable_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.is_evictable())
            .count()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.config.capacity
    }

    /// Change the capacity and trim to it.
    ///
    /// Returns the number of entries evicted.
    pub fn set_capacity(&mut self, capacity: Option<usize>) -> usize {
        self.config.capacity = capacity;
        self.release()
    }

    pub fn expire_after(&self) -> Option<Duration> {
        self.config.expire_after
    }

    /// Change the idle expiry and trim with it.
    ///
    /// Returns the number of entries evicted.
    pub fn set_expire_after(&mut self, expire_after: Option<Duration>) -> usize {
        self.config.expire_after = expire_after;
        self.release()
    }

    pub fn auto_release_interval(&self) -> Option<Duration> {
        self.config.auto_release_interval
    }

    pub fn set_auto_release_interval(&mut self, interval: Option<Duration>) -> PoolResult<()> {
        if interval == Some(Duration::ZERO) {
            return Err(PoolError::configuration(
                "auto_release_interval must be greater than zero",
            ));
        }
        self.config.auto_release_interval = interval;
        Ok(())
    }

    pub fn priority(&self) -> i32 {
        self.config.priority
    }

    pub fn set_priority(&mut self, priority: i32) {
        self.config.priority = priority;
    }

    pub fn allow_multi_borrow(&self) -> bool {
        self.config.allow_multi_borrow
    }

    /// Add a resource to the pool.
    ///
    /// With `already_borrowed` the entry starts out checked out by the
    /// caller, who must return it like any other borrow. Registering past
    /// capacity trims the pool straight away.
    pub fn register(&mut self, mut resource: T, already_borrowed: bool) -> EntryKey {
        if already_borrowed {
            resource.on_borrowed();
            self.metrics.total_borrowed += 1;
        }

        let name = resource.name().to_string();
        let entry = Entry {
            priority: resource.priority(),
            resource,
            name: name.clone(),
            locked: false,
            last_use_time: self.clock.now(),
            borrow_count: u32::from(already_borrowed),
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;

        let key = self.entries.insert(entry);
        trace!("Registered {} as {:?} in pool {}", key, name, self.category);
        self.by_name.entry(name).or_default().push(key);
        self.metrics.total_registered += 1;

        let overflow = self.overflow();
        if overflow > 0 {
            self.trim(overflow);
        }

        key
    }

    /// Whether [`borrow`](Self::borrow) would succeed for `name`.
    pub fn can_borrow(&self, name: &str) -> bool {
        self.find_borrowable(name).is_some()
    }

    /// Check out an entry registered under `name`.
    ///
    /// Returns `None` when no entry under that name is available. With
    /// multi-borrow enabled an entry already checked out is still eligible.
    pub fn borrow(&mut self, name: &str) -> Option<EntryKey> {
        let Some(key) = self.find_borrowable(name) else {
            self.metrics.borrow_misses += 1;
            trace!("No entry named {:?} available in pool {}", name, self.category);
            return None;
        };

        let now = self.clock.now();
        let entry = self.entries.get_mut(key)?;
        entry.borrow_count += 1;
        entry.last_use_time = now;
        entry.resource.on_borrowed();
        self.metrics.total_borrowed += 1;

        trace!("Borrowed {} from pool {}", key, self.category);
        Some(key)
    }

    fn find_borrowable(&self, name: &str) -> Option<EntryKey> {
        let allow_multi_borrow = self.config.allow_multi_borrow;
        self.by_name.get(name)?.iter().copied().find(|&key| {
            self.entries
                .get(key)
                .is_some_and(|entry| allow_multi_borrow || !entry.is_in_use())
        })
    }

    /// Check a borrowed entry back in.
    ///
    /// Returning more often than borrowing fails with
    /// [`PoolError::DoubleReturn`] and leaves the entry untouched. Once an
    /// entry is fully returned while the pool is over capacity, the pool
    /// trims.
    pub fn return_entry(&mut self, key: EntryKey) -> PoolResult<()> {
        let now = self.clock.now();
        let entry = self
            .entries
            .get_mut(key)
            .ok_or(PoolError::EntryNotFound(key))?;

        if entry.borrow_count == 0 {
            self.metrics.double_returns += 1;
            warn!(
                "Entry {} in pool {} was returned without being borrowed",
                key, self.category
            );
            return Err(PoolError::DoubleReturn(key));
        }

        entry.borrow_count -= 1;
        entry.last_use_time = now;
        entry.resource.on_returned();
        let idle = entry.borrow_count == 0;
        self.metrics.total_returned += 1;
        trace!("Returned {} to pool {}", key, self.category);

        let overflow = self.overflow();
        if idle && overflow > 0 {
            self.trim(overflow);
        }
        Ok(())
    }

    /// The resource behind `key`
    pub fn get(&self, key: EntryKey) -> Option<&T> {
        self.entries.get(key).map(|entry| &entry.resource)
    }

    pub fn get_mut(&mut self, key: EntryKey) -> Option<&mut T> {
        self.entries.get_mut(key).map(|entry| &mut entry.resource)
    }

    pub fn contains(&self, key: EntryKey) -> bool {
        self.entries.contains(key)
    }

    /// Pin or unpin an entry. Locked entries are never trimmed.
    pub fn lock(&mut self, key: EntryKey, locked: bool) -> PoolResult<()> {
        let entry = self
            .entries
            .get_mut(key)
            .ok_or(PoolError::EntryNotFound(key))?;
        entry.locked = locked;
        Ok(())
    }

    pub fn set_entry_priority(&mut self, key: EntryKey, priority: i32) -> PoolResult<()> {
        let entry = self
            .entries
            .get_mut(key)
            .ok_or(PoolError::EntryNotFound(key))?;
        entry.priority = priority;
        Ok(())
    }

    /// Evict a single entry.
    ///
    /// Returns `Ok(false)` without touching the entry when it is borrowed,
    /// locked or its resource vetoes release.
    pub fn evict_one(&mut self, key: EntryKey) -> PoolResult<bool> {
        let entry = self
            .entries
            .get(key)
            .ok_or(PoolError::EntryNotFound(key))?;

        if !entry.is_evictable() {
            trace!("Entry {} in pool {} is not evictable", key, self.category);
            return Ok(false);
        }

        Ok(self.evict(key, false))
    }

    /// Entries a trim pass may choose from
    pub fn candidates(&self) -> Vec<Candidate> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.is_evictable())
            .map(|(key, entry)| Candidate {
                key,
                priority: entry.priority,
                last_use_time: entry.last_use_time,
                sequence: entry.sequence,
            })
            .collect()
    }

    /// Run an eviction pass with the default [`PriorityExpiry`] selection.
    ///
    /// Every expired evictable entry is removed regardless of `requested`;
    /// up to `requested` more are then taken lowest priority first. Returns
    /// the number of entries evicted.
    pub fn trim(&mut self, requested: usize) -> usize {
        self.trim_with(requested, &PriorityExpiry)
    }

    /// Run an eviction pass with a custom selection strategy.
    ///
    /// Keys the strategy returns that are not evictable are skipped.
    pub fn trim_with<S>(&mut self, requested: usize, strategy: &S) -> usize
    where
        S: EvictionStrategy + ?Sized,
    {
        self.release_timer = Duration::ZERO;

        if requested == 0 && self.config.expire_after.is_none() {
            return 0;
        }

        self.metrics.trim_passes += 1;
        let candidates = self.candidates();
        if candidates.is_empty() {
            return 0;
        }

        let expired_before = self
            .config
            .expire_after
            .and_then(|expire_after| self.clock.now().checked_sub(expire_after));

        let mut evicted = 0;
        let mut expired = 0;
        for key in strategy.select(&candidates, requested, expired_before) {
            let Some(entry) = self.entries.get(key) else {
                continue;
            };
            if !entry.is_evictable() {
                warn!(
                    "Eviction strategy selected {} in pool {} which is not evictable",
                    key, self.category
                );
                continue;
            }

            let was_expired = expired_before.is_some_and(|cutoff| entry.last_use_time <= cutoff);
            if self.evict(key, false) {
                evicted += 1;
                if was_expired {
                    expired += 1;
                }
            }
        }

        self.metrics.expired_evictions += expired;
        if evicted > 0 {
            debug!(
                "Trimmed pool {}: evicted {} entries ({} expired), {} remain",
                self.category,
                evicted,
                expired,
                self.entries.len()
            );
        }
        evicted
    }

    /// Trim down to capacity, also sweeping expired entries.
    pub fn release(&mut self) -> usize {
        self.trim(self.overflow())
    }

    /// Evict every entry that is currently evictable.
    pub fn release_all_unused(&mut self) -> usize {
        self.trim(self.evictable_count())
    }

    /// Advance the auto-release timer. Trims once the interval is reached.
    ///
    /// Returns the number of entries evicted.
    pub fn tick(&mut self, elapsed: Duration) -> usize {
        let Some(interval) = self.config.auto_release_interval else {
            return 0;
        };

        self.release_timer = self.release_timer.saturating_add(elapsed);
        if self.release_timer < interval {
            return 0;
        }
        self.release()
    }

    /// Evict every entry unconditionally, borrowed and locked ones included.
    ///
    /// Teardown hooks see `shutdown = true`. Returns the number of entries
    /// evicted.
    pub fn shutdown(&mut self) -> usize {
        let entries = self.entries.take_all();
        self.by_name.clear();

        let count = entries.len();
        for (key, entry) in entries {
            self.dispose(key, entry, true);
        }

        if count > 0 {
            debug!("Shut down pool {}, evicted {} entries", self.category, count);
        }
        count
    }

    pub fn entry_snapshot(&self, key: EntryKey) -> Option<EntrySnapshot> {
        let now = self.clock.now();
        self.entries.get(key).map(|entry| entry.snapshot(key, now))
    }

    /// Snapshot of every entry, in slot order
    pub fn entry_snapshots(&self) -> Vec<EntrySnapshot> {
        let now = self.clock.now();
        self.entries
            .iter()
            .map(|(key, entry)| entry.snapshot(key, now))
            .collect()
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            kind: self.category.kind.name(),
            name: self.category.name.clone(),
            entries: self.entries.len(),
            in_use_entries: self.in_use_count(),
            evictable_entries: self.evictable_count(),
            capacity: self.config.capacity,
            expire_after: self.config.expire_after,
            auto_release_interval: self.config.auto_release_interval,
            priority: self.config.priority,
            allow_multi_borrow: self.config.allow_multi_borrow,
        }
    }

    /// Get pool metrics
    pub fn get_metrics(&self) -> PoolMetrics {
        self.metrics.get_metrics(
            self.entries.len(),
            self.in_use_count(),
            self.config.capacity,
        )
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }

    /// Export metrics in Prometheus format
    pub fn export_metrics_prometheus(&self, tags: Option<&HashMap<String, String>>) -> String {
        MetricsExporter::export_prometheus(
            &self.get_metrics(),
            self.category.kind.name(),
            &self.category.name,
            tags,
        )
    }

    fn overflow(&self) -> usize {
        self.config
            .capacity
            .map_or(0, |capacity| self.entries.len().saturating_sub(capacity))
    }

    fn evict(&mut self, key: EntryKey, shutdown: bool) -> bool {
        let Some(entry) = self.entries.remove(key) else {
            return false;
        };

        if let Some(keys) = self.by_name.get_mut(&entry.name) {
            keys.retain(|k| *k != key);
            if keys.is_empty() {
                self.by_name.remove(&entry.name);
            }
        }

        self.dispose(key, entry, shutdown);
        true
    }

    // Both indices must already be free of `key`.
    fn dispose(&mut self, key: EntryKey, entry: Entry<T>, shutdown: bool) {
        self.metrics.total_evicted += 1;
        trace!("Evicting {} from pool {}", key, self.category);

        if let Err(error) = entry.resource.on_evicted(shutdown) {
            self.metrics.teardown_faults += 1;
            warn!(
                "Teardown of {} ({:?}) in pool {} failed: {}",
                key, entry.name, self.category, error
            );
        }
    }
}

impl<T: Poolable> Drop for Pool<T> {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            self.shutdown();
        }
    }
}

impl<T: Poolable> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("category", &self.category)
            .field("entries", &self.entries.len())
            .field("config", &self.config)
            .field("release_timer", &self.release_timer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::errors::TeardownError;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Borrowed(u32),
        Returned(u32),
        Evicted(u32, bool),
    }

    type Log = Arc<Mutex<Vec<Event>>>;

    struct Probe {
        id: u32,
        name: &'static str,
        priority: i32,
        releasable: bool,
        fail_teardown: bool,
        log: Log,
    }

    impl Probe {
        fn new(id: u32, log: &Log) -> Self {
            Self {
                id,
                name: "",
                priority: 0,
                releasable: true,
                fail_teardown: false,
                log: Arc::clone(log),
            }
        }

        fn named(mut self, name: &'static str) -> Self {
            self.name = name;
            self
        }

        fn with_priority(mut self, priority: i32) -> Self {
            self.priority = priority;
            self
        }
    }

    impl Poolable for Probe {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn can_release(&self) -> bool {
            self.releasable
        }

        fn on_borrowed(&mut self) {
            self.log.lock().push(Event::Borrowed(self.id));
        }

        fn on_returned(&mut self) {
            self.log.lock().push(Event::Returned(self.id));
        }

        fn on_evicted(self, shutdown: bool) -> Result<(), TeardownError> {
            self.log.lock().push(Event::Evicted(self.id, shutdown));
            if self.fail_teardown {
                return Err(format!("probe {} refused to close", self.id).into());
            }
            Ok(())
        }
    }

    fn pool_with(config: PoolConfiguration) -> (Pool<Probe>, ManualClock, Log) {
        let clock = ManualClock::new();
        let pool = Pool::with_clock("test", config, Arc::new(clock.clone())).unwrap();
        (pool, clock, Log::default())
    }

    fn evicted_ids(log: &Log) -> Vec<u32> {
        log.lock()
            .iter()
            .filter_map(|event| match event {
                Event::Evicted(id, _) => Some(*id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_capacity_overflow_evicts_lowest_priority() {
        let (mut pool, _clock, log) = pool_with(PoolConfiguration::new().with_capacity(2));

        pool.register(Probe::new(1, &log).with_priority(5), false);
        pool.register(Probe::new(2, &log).with_priority(1), false);
        pool.register(Probe::new(3, &log).with_priority(3), false);

        assert_eq!(evicted_ids(&log), vec![2]);
        let mut priorities: Vec<i32> = pool.entry_snapshots().iter().map(|s| s.priority).collect();
        priorities.sort();
        assert_eq!(priorities, vec![3, 5]);
    }

    #[test]
    fn test_expired_entry_is_evicted_by_zero_trim() {
        let (mut pool, clock, log) =
            pool_with(PoolConfiguration::new().with_expire_after(Duration::from_secs(10)));

        let key = pool.register(Probe::new(1, &log), false);
        clock.advance(Duration::from_secs(11));

        assert_eq!(pool.trim(0), 1);
        assert!(!pool.contains(key));
        assert_eq!(*log.lock(), vec![Event::Evicted(1, false)]);
        assert_eq!(pool.get_metrics().expired_evictions, 1);
    }

    #[test]
    fn test_exclusive_borrow() {
        let (mut pool, _clock, log) = pool_with(PoolConfiguration::new());
        pool.register(Probe::new(1, &log).named("bullet"), false);

        let key = pool.borrow("bullet").unwrap();
        assert_eq!(pool.borrow("bullet"), None);
        assert!(!pool.can_borrow("bullet"));

        pool.return_entry(key).unwrap();
        assert_eq!(pool.borrow("bullet"), Some(key));
        assert_eq!(pool.get_metrics().borrow_misses, 1);
    }

    #[test]
    fn test_borrow_unknown_name() {
        let (mut pool, _clock, log) = pool_with(PoolConfiguration::new());
        pool.register(Probe::new(1, &log).named("bullet"), false);

        assert!(!pool.can_borrow("shell"));
        assert_eq!(pool.borrow("shell"), None);
        assert_eq!(pool.borrow(""), None);
    }

    #[test]
    fn test_duplicate_names_are_interchangeable() {
        let (mut pool, _clock, log) = pool_with(PoolConfiguration::new());
        pool.register(Probe::new(1, &log).named("bullet"), false);
        pool.register(Probe::new(2, &log).named("bullet"), false);

        let a = pool.borrow("bullet").unwrap();
        let b = pool.borrow("bullet").unwrap();
        assert_ne!(a, b);
        assert_eq!(pool.borrow("bullet"), None);
    }

    #[test]
    fn test_multi_borrow_counts_every_holder() {
        let (mut pool, _clock, log) = pool_with(PoolConfiguration::new().with_multi_borrow(true));
        let key = pool.register(Probe::new(1, &log), false);

        assert_eq!(pool.borrow(""), Some(key));
        assert_eq!(pool.borrow(""), Some(key));
        assert_eq!(pool.entry_snapshot(key).unwrap().borrow_count, 2);

        pool.return_entry(key).unwrap();
        assert_eq!(pool.release_all_unused(), 0);
        assert!(pool.entry_snapshot(key).unwrap().is_in_use());

        pool.return_entry(key).unwrap();
        assert_eq!(pool.release_all_unused(), 1);
    }

    #[test]
    fn test_borrow_return_round_trip() {
        let (mut pool, clock, log) = pool_with(PoolConfiguration::new());
        let key = pool.register(Probe::new(1, &log), false);

        let key2 = pool.borrow("").unwrap();
        assert_eq!(key, key2);
        clock.advance(Duration::from_secs(3));
        pool.return_entry(key).unwrap();

        let snapshot = pool.entry_snapshot(key).unwrap();
        assert_eq!(snapshot.borrow_count, 0);
        assert_eq!(snapshot.last_use_time, clock.now());
        assert_eq!(*log.lock(), vec![Event::Borrowed(1), Event::Returned(1)]);
    }

    #[test]
    fn test_double_return_is_reported_and_harmless() {
        let (mut pool, clock, log) = pool_with(PoolConfiguration::new());
        let key = pool.register(Probe::new(1, &log), false);
        let before = pool.entry_snapshot(key).unwrap();

        clock.advance(Duration::from_secs(1));
        assert_eq!(pool.return_entry(key), Err(PoolError::DoubleReturn(key)));

        let after = pool.entry_snapshot(key).unwrap();
        assert_eq!(after.borrow_count, 0);
        assert_eq!(after.last_use_time, before.last_use_time);
        assert!(log.lock().is_empty());
        assert_eq!(pool.get_metrics().double_returns, 1);
    }

    #[test]
    fn test_already_borrowed_registration() {
        let (mut pool, _clock, log) = pool_with(PoolConfiguration::new());
        let key = pool.register(Probe::new(1, &log), true);

        assert_eq!(pool.entry_snapshot(key).unwrap().borrow_count, 1);
        assert_eq!(pool.borrow(""), None);
        pool.return_entry(key).unwrap();
        assert_eq!(*log.lock(), vec![Event::Borrowed(1), Event::Returned(1)]);
    }

    #[test]
    fn test_trim_skips_protected_entries() {
        let (mut pool, _clock, log) = pool_with(PoolConfiguration::new());
        let borrowed = pool.register(Probe::new(1, &log), true);
        let locked = pool.register(Probe::new(2, &log), false);
        pool.lock(locked, true).unwrap();
        let mut vetoed = Probe::new(3, &log);
        vetoed.releasable = false;
        let vetoed = pool.register(vetoed, false);
        let plain = pool.register(Probe::new(4, &log), false);

        assert_eq!(pool.trim(10), 1);
        assert!(pool.contains(borrowed));
        assert!(pool.contains(locked));
        assert!(pool.contains(vetoed));
        assert!(!pool.contains(plain));
    }

    #[test]
    fn test_zero_trim_without_expiry_is_noop() {
        let (mut pool, _clock, log) = pool_with(PoolConfiguration::new());
        pool.register(Probe::new(1, &log), false);

        assert_eq!(pool.trim(0), 0);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get_metrics().trim_passes, 0);
    }

    #[test]
    fn test_expiry_is_inclusive_of_cutoff() {
        let (mut pool, clock, log) =
            pool_with(PoolConfiguration::new().with_expire_after(Duration::from_secs(5)));
        pool.register(Probe::new(1, &log), false);
        clock.advance(Duration::from_secs(2));
        pool.register(Probe::new(2, &log), false);
        clock.advance(Duration::from_secs(3));

        assert_eq!(pool.trim(0), 1);
        assert_eq!(evicted_ids(&log), vec![1]);
    }

    #[test]
    fn test_return_over_capacity_trims() {
        let (mut pool, _clock, log) = pool_with(PoolConfiguration::new().with_capacity(1));
        let a = pool.register(Probe::new(1, &log), true);
        let b = pool.register(Probe::new(2, &log), true);
        assert_eq!(pool.len(), 2);

        pool.return_entry(a).unwrap();
        assert_eq!(pool.len(), 1);
        assert!(!pool.contains(a));
        assert!(pool.contains(b));
    }

    #[test]
    fn test_teardown_fault_does_not_stop_the_pass() {
        let (mut pool, _clock, log) = pool_with(PoolConfiguration::new());
        pool.register(Probe::new(1, &log), false);
        let mut faulty = Probe::new(2, &log);
        faulty.fail_teardown = true;
        pool.register(faulty, false);
        pool.register(Probe::new(3, &log), false);

        assert_eq!(pool.release_all_unused(), 3);
        assert!(pool.is_empty());
        let mut ids = evicted_ids(&log);
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(pool.get_metrics().teardown_faults, 1);
    }

    #[test]
    fn test_evict_one() {
        let (mut pool, _clock, log) = pool_with(PoolConfiguration::new());
        let borrowed = pool.register(Probe::new(1, &log), true);
        let locked = pool.register(Probe::new(2, &log), false);
        pool.lock(locked, true).unwrap();
        let plain = pool.register(Probe::new(3, &log), false);

        assert_eq!(pool.evict_one(borrowed), Ok(false));
        assert_eq!(pool.evict_one(locked), Ok(false));
        assert_eq!(pool.evict_one(plain), Ok(true));
        assert_eq!(pool.evict_one(plain), Err(PoolError::EntryNotFound(plain)));

        pool.lock(locked, false).unwrap();
        assert_eq!(pool.evict_one(locked), Ok(true));
    }

    #[test]
    fn test_stale_key_does_not_reach_new_occupant() {
        let (mut pool, _clock, log) = pool_with(PoolConfiguration::new());
        let old = pool.register(Probe::new(1, &log), false);
        pool.evict_one(old).unwrap();
        let new = pool.register(Probe::new(2, &log), false);

        assert_eq!(old.index(), new.index());
        assert_eq!(pool.lock(old, true), Err(PoolError::EntryNotFound(old)));
        assert_eq!(pool.set_entry_priority(old, 1), Err(PoolError::EntryNotFound(old)));
        assert_eq!(pool.return_entry(old), Err(PoolError::EntryNotFound(old)));
        assert_eq!(pool.get(new).map(|probe| probe.id), Some(2));
    }

    #[test]
    fn test_set_entry_priority_changes_selection() {
        let (mut pool, _clock, log) = pool_with(PoolConfiguration::new());
        let a = pool.register(Probe::new(1, &log), false);
        let b = pool.register(Probe::new(2, &log), false);
        pool.set_entry_priority(a, 10).unwrap();

        assert_eq!(pool.trim(1), 1);
        assert!(pool.contains(a));
        assert!(!pool.contains(b));
    }

    #[test]
    fn test_older_entry_goes_first_on_equal_priority() {
        let (mut pool, clock, log) = pool_with(PoolConfiguration::new());
        let a = pool.register(Probe::new(1, &log), false);
        clock.advance(Duration::from_secs(1));
        let b = pool.register(Probe::new(2, &log), false);
        clock.advance(Duration::from_secs(1));
        pool.borrow("").unwrap();
        pool.return_entry(a).unwrap();

        assert_eq!(pool.trim(1), 1);
        assert!(pool.contains(a));
        assert!(!pool.contains(b));
    }

    #[test]
    fn test_reused_slot_does_not_jump_the_queue() {
        let (mut pool, _clock, log) = pool_with(PoolConfiguration::new());
        let a = pool.register(Probe::new(1, &log), false);
        let b = pool.register(Probe::new(2, &log), false);
        assert_eq!(pool.evict_one(a), Ok(true));

        let c = pool.register(Probe::new(3, &log), false);
        assert_eq!(c.index(), a.index());

        assert_eq!(pool.trim(1), 1);
        assert!(!pool.contains(b));
        assert!(pool.contains(c));
        assert_eq!(evicted_ids(&log), vec![1, 2]);
    }

    #[test]
    fn test_set_capacity_trims_immediately() {
        let (mut pool, _clock, log) = pool_with(PoolConfiguration::new());
        for id in 0..5 {
            pool.register(Probe::new(id, &log).with_priority(id as i32), false);
        }

        assert_eq!(pool.set_capacity(Some(2)), 3);
        assert_eq!(evicted_ids(&log), vec![0, 1, 2]);
    }

    #[test]
    fn test_set_expire_after_sweeps_immediately() {
        let (mut pool, clock, log) = pool_with(PoolConfiguration::new());
        pool.register(Probe::new(1, &log), false);
        clock.advance(Duration::from_secs(30));

        assert_eq!(pool.set_expire_after(Some(Duration::from_secs(10))), 1);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_tick_trims_after_interval() {
        let config = PoolConfiguration::new()
            .with_expire_after(Duration::from_secs(5))
            .with_auto_release_interval(Duration::from_secs(1));
        let (mut pool, clock, log) = pool_with(config);
        pool.register(Probe::new(1, &log), false);
        clock.advance(Duration::from_secs(6));

        assert_eq!(pool.tick(Duration::from_millis(600)), 0);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.tick(Duration::from_millis(600)), 1);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_any_trim_resets_release_timer() {
        let config = PoolConfiguration::new()
            .with_expire_after(Duration::from_secs(5))
            .with_auto_release_interval(Duration::from_secs(1));
        let (mut pool, clock, log) = pool_with(config);
        pool.register(Probe::new(1, &log), false);

        assert_eq!(pool.tick(Duration::from_millis(900)), 0);
        pool.release();
        clock.advance(Duration::from_secs(6));
        assert_eq!(pool.tick(Duration::from_millis(900)), 0);
        assert_eq!(pool.tick(Duration::from_millis(100)), 1);
    }

    #[test]
    fn test_tick_without_interval_never_trims() {
        let (mut pool, clock, log) =
            pool_with(PoolConfiguration::new().with_expire_after(Duration::from_secs(1)));
        pool.register(Probe::new(1, &log), false);
        clock.advance(Duration::from_secs(60));

        assert_eq!(pool.tick(Duration::from_secs(60)), 0);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_custom_strategy_cannot_evict_protected_entries() {
        let (mut pool, _clock, log) = pool_with(PoolConfiguration::new());
        let locked = pool.register(Probe::new(1, &log), false);
        pool.lock(locked, true).unwrap();
        let plain = pool.register(Probe::new(2, &log), false);

        let everything = |_: &[Candidate], _: usize, _: Option<Instant>| -> Vec<EntryKey> {
            vec![locked, plain, plain]
        };
        assert_eq!(pool.trim_with(1, &everything), 1);
        assert!(pool.contains(locked));
        assert!(!pool.contains(plain));
    }

    #[test]
    fn test_shutdown_evicts_everything() {
        let (mut pool, _clock, log) = pool_with(PoolConfiguration::new());
        pool.register(Probe::new(1, &log), true);
        let locked = pool.register(Probe::new(2, &log), false);
        pool.lock(locked, true).unwrap();

        assert_eq!(pool.shutdown(), 2);
        assert!(pool.is_empty());
        let events = log.lock().clone();
        assert!(events.contains(&Event::Evicted(1, true)));
        assert!(events.contains(&Event::Evicted(2, true)));
    }

    #[test]
    fn test_drop_tears_down_remaining_entries() {
        let (mut pool, _clock, log) = pool_with(PoolConfiguration::new());
        pool.register(Probe::new(1, &log), false);
        drop(pool);

        assert_eq!(*log.lock(), vec![Event::Evicted(1, true)]);
    }

    #[test]
    fn test_snapshot_and_metrics() {
        let (mut pool, _clock, log) = pool_with(PoolConfiguration::new().with_capacity(4));
        pool.register(Probe::new(1, &log), true);
        pool.register(Probe::new(2, &log), false);

        let snapshot = pool.snapshot();
        assert_eq!(snapshot.name, "test");
        assert!(snapshot.kind.ends_with("Probe"));
        assert_eq!(snapshot.entries, 2);
        assert_eq!(snapshot.in_use_entries, 1);
        assert_eq!(snapshot.evictable_entries, 1);
        assert_eq!(snapshot.overflow(), 0);

        let metrics = pool.get_metrics();
        assert_eq!(metrics.utilization, 0.5);
        let exported = pool.export_metrics_prometheus(None);
        assert!(exported.contains("pool=\"test\""));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let (mut pool, _clock, _log) = pool_with(PoolConfiguration::new());
        assert!(pool.set_auto_release_interval(Some(Duration::ZERO)).is_err());
        assert!(pool.set_auto_release_interval(Some(Duration::from_secs(1))).is_ok());
    }
}
