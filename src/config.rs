//! Pool configuration options

use crate::errors::{PoolError, PoolResult};
use std::time::Duration;

/// Configuration for a resource pool
///
/// # Examples
///
/// ```
/// use esox_resourcepool::PoolConfiguration;
/// use std::time::Duration;
///
/// let config = PoolConfiguration::new()
///     .with_capacity(16)
///     .with_expire_after(Duration::from_secs(60))
///     .with_auto_release_interval(Duration::from_secs(5))
///     .with_priority(2);
///
/// assert_eq!(config.capacity, Some(16));
/// assert!(!config.allow_multi_borrow);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolConfiguration {
    /// Number of entries the pool tries to stay at or below. `None` is unbounded.
    #[cfg_attr(feature = "serde", serde(default))]
    pub capacity: Option<usize>,

    /// Idle time after which an evictable entry is removed by any trim pass.
    /// `None` means entries never expire.
    #[cfg_attr(feature = "serde", serde(default))]
    pub expire_after: Option<Duration>,

    /// How much ticked time must accumulate before the pool trims itself.
    /// `None` disables time-driven trimming.
    #[cfg_attr(feature = "serde", serde(default))]
    pub auto_release_interval: Option<Duration>,

    /// Pool priority. Lower priority pools are torn down first at shutdown.
    #[cfg_attr(feature = "serde", serde(default))]
    pub priority: i32,

    /// Whether an entry may be borrowed again while it is already borrowed.
    #[cfg_attr(feature = "serde", serde(default))]
    pub allow_multi_borrow: bool,
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            capacity: None,
            expire_after: None,
            auto_release_interval: None,
            priority: 0,
            allow_multi_borrow: false,
        }
    }
}

impl PoolConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Set the idle expiry
    pub fn with_expire_after(mut self, expire_after: Duration) -> Self {
        self.expire_after = Some(expire_after);
        self
    }

    /// Set the idle expiry from fractional seconds.
    ///
    /// Infinite means never. Negative or NaN values are rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_resourcepool::PoolConfiguration;
    ///
    /// assert!(PoolConfiguration::new().with_expire_after_secs(-1.0).is_err());
    ///
    /// let config = PoolConfiguration::new().with_expire_after_secs(f64::INFINITY).unwrap();
    /// assert_eq!(config.expire_after, None);
    /// ```
    pub fn with_expire_after_secs(mut self, secs: f64) -> PoolResult<Self> {
        self.expire_after = secs_to_duration("expire_after", secs)?;
        Ok(self)
    }

    /// Set the auto-release interval
    pub fn with_auto_release_interval(mut self, interval: Duration) -> Self {
        self.auto_release_interval = Some(interval);
        self
    }

    /// Set the auto-release interval from fractional seconds.
    ///
    /// Infinite means never. Negative or NaN values are rejected.
    pub fn with_auto_release_interval_secs(mut self, secs: f64) -> PoolResult<Self> {
        self.auto_release_interval = secs_to_duration("auto_release_interval", secs)?;
        Ok(self)
    }

    /// Set the pool priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Allow entries to be borrowed by several holders at once
    pub fn with_multi_borrow(mut self, allow: bool) -> Self {
        self.allow_multi_borrow = allow;
        self
    }

    /// Validate the configuration, returning an error if invalid.
    pub fn validate(&self) -> PoolResult<()> {
        if self.auto_release_interval == Some(Duration::ZERO) {
            return Err(PoolError::configuration(
                "auto_release_interval must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn secs_to_duration(field: &str, secs: f64) -> PoolResult<Option<Duration>> {
    if secs.is_nan() || secs < 0.0 {
        return Err(PoolError::configuration(format!(
            "{field} must be a non-negative number of seconds, got {secs}"
        )));
    }
    if secs.is_infinite() {
        return Ok(None);
    }
    Duration::try_from_secs_f64(secs)
        .map(Some)
        .map_err(|e| PoolError::configuration(format!("{field} is out of range: {e}")))
}
