//! Host-side scheduler that ticks a registry on a tokio interval

use crate::registry::PoolRegistry;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

/// Background task calling [`PoolRegistry::tick`] every `period`.
///
/// The elapsed time handed to each tick is measured, so a late wakeup still
/// advances the pools by the real time that passed. Dropping the driver
/// without calling [`stop`](Self::stop) also ends the task at its next wakeup.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{PoolRegistry, TickDriver};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let registry = Arc::new(PoolRegistry::new());
/// let driver = TickDriver::spawn(Arc::clone(&registry), Duration::from_millis(100));
/// // ... host runs ...
/// driver.stop().await;
/// # }
/// ```
#[derive(Debug)]
pub struct TickDriver {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl TickDriver {
    /// Start ticking `registry`.
    ///
    /// Must be called from within a tokio runtime. Panics if `period` is zero.
    pub fn spawn(registry: Arc<PoolRegistry>, period: Duration) -> Self {
        let (stop, mut stopped) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            let mut last = interval.tick().await;
            debug!("Tick driver started with period {:?}", period);

            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    now = interval.tick() => {
                        let elapsed = now.saturating_duration_since(last);
                        last = now;
                        let evicted = registry.tick(elapsed);
                        if evicted > 0 {
                            trace!("Tick of {:?} evicted {} entries", elapsed, evicted);
                        }
                    }
                }
            }

            debug!("Tick driver stopped");
        });

        Self { stop, handle }
    }

    /// Stop ticking and wait for the task to finish.
    ///
    /// A task that already died, for instance from a panicking teardown
    /// hook, is reported at warn level.
    pub async fn stop(self) {
        let _ = self.stop.send(());
        if let Err(error) = self.handle.await {
            warn!("Tick driver task ended abnormally: {}", error);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
