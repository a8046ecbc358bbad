//! Registry of pools keyed by resource kind and pool name

use crate::category::CategoryKey;
use crate::clock::{Clock, SystemClock};
use crate::config::PoolConfiguration;
use crate::errors::{PoolError, PoolResult};
use crate::metrics::{MetricsExporter, PoolMetrics};
use crate::pool::Pool;
use crate::resource::Poolable;
use crate::snapshot::PoolSnapshot;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Handle to a pool owned by a [`PoolRegistry`].
///
/// The mutex is the pool's single coarse lock; every pool operation runs
/// while holding it.
pub type SharedPool<T> = Arc<Mutex<Pool<T>>>;

/// Operations the registry broadcasts without knowing the resource type
trait ErasedPool: Send + Sync {
    fn tick(&self, elapsed: Duration) -> usize;
    fn release(&self) -> usize;
    fn release_all_unused(&self) -> usize;
    fn shutdown(&self) -> usize;
    fn priority(&self) -> i32;
    fn snapshot(&self) -> PoolSnapshot;
    fn metrics(&self) -> (PoolMetrics, &'static str, String);
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Poolable> ErasedPool for Mutex<Pool<T>> {
    fn tick(&self, elapsed: Duration) -> usize {
        self.lock().tick(elapsed)
    }

    fn release(&self) -> usize {
        self.lock().release()
    }

    fn release_all_unused(&self) -> usize {
        self.lock().release_all_unused()
    }

    fn shutdown(&self) -> usize {
        self.lock().shutdown()
    }

    fn priority(&self) -> i32 {
        self.lock().priority()
    }

    fn snapshot(&self) -> PoolSnapshot {
        self.lock().snapshot()
    }

    fn metrics(&self) -> (PoolMetrics, &'static str, String) {
        let pool = self.lock();
        (
            pool.get_metrics(),
            pool.category().kind.name(),
            pool.name().to_string(),
        )
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Creates, finds and destroys pools, and drives their time-based trimming.
///
/// Nothing trims on a timer by itself: the host calls [`tick`](Self::tick)
/// once per cycle, or spawns a [`TickDriver`](crate::TickDriver).
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{PoolConfiguration, PoolRegistry, Poolable};
/// use std::time::Duration;
///
/// struct Sprite;
/// impl Poolable for Sprite {}
///
/// let registry = PoolRegistry::new();
/// let pool = registry
///     .create_pool::<Sprite>("ui", PoolConfiguration::new().with_capacity(32))
///     .unwrap();
///
/// pool.lock().register(Sprite, false);
/// assert!(registry.has_pool::<Sprite>("ui"));
/// assert!(registry.create_pool::<Sprite>("ui", PoolConfiguration::new()).is_err());
///
/// registry.tick(Duration::from_millis(16));
/// registry.shutdown();
/// assert!(registry.is_empty());
/// ```
pub struct PoolRegistry {
    pools: DashMap<CategoryKey, Arc<dyn ErasedPool>>,
    clock: Arc<dyn Clock>,
}

impl PoolRegistry {
    /// Create a registry whose pools use the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a registry whose pools read time from `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            pools: DashMap::new(),
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Number of registered pools
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Create the pool for resource `T` named `name`.
    ///
    /// Fails with [`PoolError::DuplicatePool`] if it already exists.
    pub fn create_pool<T: Poolable>(
        &self,
        name: impl Into<String>,
        config: PoolConfiguration,
    ) -> PoolResult<SharedPool<T>> {
        let key = CategoryKey::new::<T>(name);

        match self.pools.entry(key) {
            MapEntry::Occupied(occupied) => {
                let key = occupied.key();
                Err(PoolError::DuplicatePool {
                    kind: key.kind.name(),
                    name: key.name.clone(),
                })
            }
            MapEntry::Vacant(vacant) => {
                let pool = Pool::<T>::with_clock(
                    vacant.key().name.clone(),
                    config,
                    Arc::clone(&self.clock),
                )?;
                let shared: SharedPool<T> = Arc::new(Mutex::new(pool));
                vacant.insert(Arc::clone(&shared) as Arc<dyn ErasedPool>);
                Ok(shared)
            }
        }
    }

    /// Look up the pool for resource `T` named `name`
    pub fn get_pool<T: Poolable>(&self, name: &str) -> Option<SharedPool<T>> {
        let key = CategoryKey::new::<T>(name);
        let erased = Arc::clone(self.pools.get(&key)?.value());
        erased.into_any().downcast::<Mutex<Pool<T>>>().ok()
    }

    /// Like [`get_pool`](Self::get_pool), failing with
    /// [`PoolError::PoolNotFound`] when the pool does not exist.
    pub fn pool<T: Poolable>(&self, name: &str) -> PoolResult<SharedPool<T>> {
        self.get_pool::<T>(name).ok_or_else(|| {
            let key = CategoryKey::new::<T>(name);
            PoolError::PoolNotFound {
                kind: key.kind.name(),
                name: key.name,
            }
        })
    }

    pub fn has_pool<T: Poolable>(&self, name: &str) -> bool {
        self.pools.contains_key(&CategoryKey::new::<T>(name))
    }

    /// Tear down every entry of the pool and remove it.
    ///
    /// Returns false when no such pool exists.
    pub fn destroy_pool<T: Poolable>(&self, name: &str) -> bool {
        let key = CategoryKey::new::<T>(name);
        let Some((key, pool)) = self.pools.remove(&key) else {
            return false;
        };

        let evicted = pool.shutdown();
        debug!("Destroyed pool {}, evicted {} entries", key, evicted);
        true
    }

    /// Advance every pool's auto-release timer by `elapsed`.
    ///
    /// Returns the number of entries evicted across all pools.
    pub fn tick(&self, elapsed: Duration) -> usize {
        self.pools_snapshot()
            .iter()
            .map(|pool| pool.tick(elapsed))
            .sum()
    }

    /// Trim every pool down to its capacity
    pub fn release_all(&self) -> usize {
        self.pools_snapshot()
            .iter()
            .map(|pool| pool.release())
            .sum()
    }

    /// Evict every evictable entry in every pool
    pub fn release_all_unused(&self) -> usize {
        self.pools_snapshot()
            .iter()
            .map(|pool| pool.release_all_unused())
            .sum()
    }

    /// Tear down every pool, lowest priority first, and clear the registry.
    pub fn shutdown(&self) {
        let mut pools: Vec<(CategoryKey, Arc<dyn ErasedPool>)> = self
            .pools
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        self.pools.clear();

        pools.sort_by_key(|(_, pool)| pool.priority());

        let mut evicted = 0;
        for (key, pool) in &pools {
            let count = pool.shutdown();
            debug!("Shut down pool {} ({} entries)", key, count);
            evicted += count;
        }
        info!("Pool registry shut down: {} pools, {} entries evicted", pools.len(), evicted);
    }

    /// Figures for every pool, lowest priority first
    pub fn pool_snapshots(&self) -> Vec<PoolSnapshot> {
        let mut snapshots: Vec<PoolSnapshot> = self
            .pools_snapshot()
            .iter()
            .map(|pool| pool.snapshot())
            .collect();
        snapshots.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.kind.cmp(&b.kind))
                .then_with(|| a.name.cmp(&b.name))
        });
        snapshots
    }

    /// Export metrics of every pool in Prometheus format
    pub fn export_metrics_prometheus(&self, tags: Option<&HashMap<String, String>>) -> String {
        let mut collected: Vec<(PoolMetrics, &'static str, String)> = self
            .pools_snapshot()
            .iter()
            .map(|pool| pool.metrics())
            .collect();
        collected.sort_by(|a, b| (a.1, &a.2).cmp(&(b.1, &b.2)));

        let samples: Vec<(&PoolMetrics, &str, &str)> = collected
            .iter()
            .map(|(metrics, kind, name)| (metrics, *kind, name.as_str()))
            .collect();
        MetricsExporter::export_prometheus_many(&samples, tags)
    }

    // Pools are cloned out of the map so no shard lock is held while a pool
    // runs hooks.
    fn pools_snapshot(&self) -> Vec<Arc<dyn ErasedPool>> {
        self.pools
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
