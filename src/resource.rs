//! Hooks a pooled resource exposes to its pool

use crate::errors::TeardownError;

/// A resource that can be held by a [`Pool`](crate::Pool).
///
/// Every hook has a default, so a plain marker impl is enough for resources
/// that need no bookkeeping.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{Poolable, TeardownError};
///
/// struct Connection {
///     host: String,
///     busy_flushing: bool,
/// }
///
/// impl Poolable for Connection {
///     fn name(&self) -> &str {
///         &self.host
///     }
///
///     fn can_release(&self) -> bool {
///         !self.busy_flushing
///     }
///
///     fn on_evicted(self, shutdown: bool) -> Result<(), TeardownError> {
///         if !shutdown {
///             // say goodbye to the peer
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Poolable: Send + 'static {
    /// Name the entry is registered under. Several resources may share one.
    fn name(&self) -> &str {
        ""
    }

    /// Eviction priority the entry starts with. Lower values are evicted first.
    fn priority(&self) -> i32 {
        0
    }

    /// Veto on eviction. Checked on every trim pass, so it may change over
    /// the resource's lifetime.
    fn can_release(&self) -> bool {
        true
    }

    /// Called once per successful borrow.
    fn on_borrowed(&mut self) {}

    /// Called once per successful return.
    fn on_returned(&mut self) {}

    /// Called exactly once when the pool lets go of the resource.
    ///
    /// `shutdown` is true when the whole pool is being torn down, in which
    /// case the resource may skip work it would do on a graceful release.
    ///
    /// Faults are reported through `Err`. The pool logs them and moves on to
    /// the next entry. The hook must not panic: a panic unwinds out of the
    /// trim pass and leaves the remaining victims in the pool.
    fn on_evicted(self, shutdown: bool) -> Result<(), TeardownError>
    where
        Self: Sized,
    {
        let _ = shutdown;
        Ok(())
    }
}
