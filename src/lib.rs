//! # EsoxSolutions.ResourcePool
//!
//! Registry of named, typed resource pools. Each pool keeps a set of
//! interchangeable resources under one capacity, expiry, priority and
//! exclusivity policy, and trims itself with a two-phase eviction pass.
//!
//! ## Features
//!
//! - Pools keyed by resource type and pool name
//! - Exclusive or shared borrowing, with explicit check-in
//! - Capacity enforcement on register and return
//! - Idle expiry swept on every trim pass
//! - Lowest-priority, least-recently-used selection for capacity overflow
//! - Lock and per-resource veto to pin entries
//! - Pluggable eviction strategies
//! - Host-driven auto-release via `tick`, or a tokio tick driver
//! - Snapshots, metrics and Prometheus export
//!
//! ## Quick Start
//!
//! ```rust
//! use esox_resourcepool::{PoolConfiguration, PoolRegistry, Poolable};
//!
//! struct Bullet;
//! impl Poolable for Bullet {
//!     fn name(&self) -> &str {
//!         "bullet"
//!     }
//! }
//!
//! let registry = PoolRegistry::new();
//! let pool = registry
//!     .create_pool::<Bullet>("", PoolConfiguration::new().with_capacity(64))
//!     .unwrap();
//!
//! let mut pool = pool.lock();
//! pool.register(Bullet, false);
//! let key = pool.borrow("bullet").unwrap();
//! // ... fire the bullet ...
//! pool.return_entry(key).unwrap();
//! ```

mod category;
mod clock;
mod config;
mod driver;
mod errors;
mod eviction;
mod metrics;
mod pool;
mod registry;
mod resource;
mod slots;
mod snapshot;

pub use category::{CategoryKey, ResourceKind};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::PoolConfiguration;
pub use driver::TickDriver;
pub use errors::{ErrorClass, PoolError, PoolResult, TeardownError};
pub use eviction::{Candidate, EvictionStrategy, PriorityExpiry};
pub use metrics::{MetricsExporter, PoolMetrics};
pub use pool::Pool;
pub use registry::{PoolRegistry, SharedPool};
pub use resource::Poolable;
pub use slots::EntryKey;
pub use snapshot::{EntrySnapshot, PoolSnapshot};
