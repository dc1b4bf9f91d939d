//! Deadline-bounded blocking pool.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use respool::sync::Pool;
//!
//! let pool = Pool::<String>::builder(2).build().unwrap();
//! {
//!     let mut handle = pool.get_auto_recycle(Duration::from_secs(1)).unwrap();
//!     handle.reset("hello".to_string()).unwrap();
//!     assert_eq!(handle.get().unwrap(), "hello");
//! }
//! assert_eq!(pool.stats().available, 2);
//! ```

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::config::PoolConfig;
use crate::error::Error;
use crate::handle::{Handle, PoolReturns, Strategy};
use crate::storage::{CellIndex, Storage, StorageStats};
use crate::time::{Clock, SystemClock};

/// Storage plus the disabled flag, behind one lock.
///
/// The original C++ pool guards both under a single mutex (see
/// `sync/detail/pool_impl.hpp`) so that disabling and notifying waiters
/// is atomic with respect to a waiter registering itself via
/// `condvar.wait_timeout`. A separate `Mutex<bool>` would leave a
/// window between a waiter's disabled-check and its wait call in which
/// `disable()` could set the flag and notify with nobody parked yet.
struct State<T> {
    storage: Storage<T>,
    disabled: bool,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    condvar: Condvar,
    clock: Arc<dyn Clock>,
}

impl<T: Send> PoolReturns<T> for Inner<T> {
    fn recycle(&self, cell: CellIndex, value: T) {
        let now = self.clock.now();
        self.state.lock().unwrap().storage.recycle(cell, value, now);
        #[cfg(feature = "tracing")]
        tracing::debug!(cell = cell.0, "notifying a waiter on recycle");
        self.condvar.notify_one();
    }

    fn waste(&self, cell: CellIndex) {
        self.state.lock().unwrap().storage.waste(cell);
        self.condvar.notify_one();
    }

    fn mark_reset(&self, cell: CellIndex) {
        let now = self.clock.now();
        self.state.lock().unwrap().storage.mark_reset(cell, now);
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        self.state.lock().unwrap().disabled = true;
        self.condvar.notify_all();
    }
}

/// A generic, bounded, blocking resource pool.
///
/// Cloning a `Pool` is cheap: it shares its inner state via an [`Arc`].
pub struct Pool<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Pool {
            inner: self.inner.clone(),
        }
    }
}

/// Builds a [`Pool`], optionally seeding it with initial values and a
/// non-default clock.
pub struct Builder<T> {
    capacity: usize,
    idle_timeout: Duration,
    lifespan: Duration,
    clock: Arc<dyn Clock>,
    seed: Option<Box<dyn FnOnce(Duration, Duration) -> Storage<T>>>,
}

impl<T: Send + 'static> Builder<T> {
    fn new(capacity: usize) -> Self {
        Builder {
            capacity,
            idle_timeout: Duration::MAX,
            lifespan: Duration::MAX,
            clock: Arc::new(SystemClock),
            seed: None,
        }
    }

    pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn lifespan(mut self, lifespan: Duration) -> Self {
        self.lifespan = lifespan;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Applies `capacity`/`idle_timeout`/`lifespan` from `value` onto
    /// this builder, overwriting whatever was set before it. Mirrors
    /// the teacher's `managed::Builder::config`.
    pub fn config(mut self, value: PoolConfig) -> Self {
        self.capacity = value.capacity;
        self.idle_timeout = value.idle_timeout;
        self.lifespan = value.lifespan;
        self
    }

    /// Pre-populates the pool from an exact-size iterator of values.
    /// The iterator's length becomes the pool's capacity.
    pub fn with_values<I>(mut self, iter: I) -> Self
    where
        I: IntoIterator<Item = T> + 'static,
        I::IntoIter: ExactSizeIterator,
    {
        self.capacity = 0; // overwritten below once we know the real length
        self.seed = Some(Box::new(move |idle_timeout, lifespan| {
            Storage::seeded(iter, idle_timeout, lifespan)
        }));
        self
    }

    pub fn build(self) -> Result<Pool<T>, Error> {
        let storage = if let Some(seed) = self.seed {
            let storage = seed(self.idle_timeout, self.lifespan);
            if storage.capacity() == 0 {
                return Err(Error::ZeroPoolCapacity);
            }
            storage
        } else {
            if self.capacity == 0 {
                return Err(Error::ZeroPoolCapacity);
            }
            Storage::new(self.capacity, self.idle_timeout, self.lifespan)
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(capacity = storage.capacity(), "pool constructed");
        Ok(Pool {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    storage,
                    disabled: false,
                }),
                condvar: Condvar::new(),
                clock: self.clock,
            }),
        })
    }
}

impl<T: Send + 'static> Pool<T> {
    /// Starts building a pool of `capacity` empty cells.
    pub fn builder(capacity: usize) -> Builder<T> {
        Builder::new(capacity)
    }

    /// Number of cells the pool holds.
    pub fn capacity(&self) -> usize {
        self.inner.state.lock().unwrap().storage.capacity()
    }

    /// Lane occupancy snapshot.
    pub fn stats(&self) -> StorageStats {
        self.inner.state.lock().unwrap().storage.stats()
    }

    /// Waits up to `wait` for a cell, returning a [`Handle`] whose
    /// `Drop` (or explicit call) recycles the cell back into
    /// `available`.
    pub fn get_auto_recycle(&self, wait: Duration) -> Result<Handle<T>, Error> {
        self.get(wait, Strategy::Recycle)
    }

    /// Waits up to `wait` for a cell, returning a [`Handle`] whose
    /// `Drop` (or explicit call) wastes the cell instead of recycling
    /// it.
    pub fn get_auto_waste(&self, wait: Duration) -> Result<Handle<T>, Error> {
        self.get(wait, Strategy::Waste)
    }

    fn get(&self, wait: Duration, strategy: Strategy) -> Result<Handle<T>, Error> {
        let deadline = crate::time::saturating_add(self.inner.clock.now(), wait);
        let mut state = self.inner.state.lock().unwrap();
        loop {
            if state.disabled {
                return Err(Error::Disabled);
            }
            let now = self.inner.clock.now();
            if let Some((cell, value)) = state.storage.lease(now) {
                return Ok(Handle::new(self.inner.clone(), cell, value, strategy));
            }
            let now = self.inner.clock.now();
            if now >= deadline {
                return Err(Error::GetResourceTimeout);
            }
            let remaining = deadline.saturating_duration_since(now);
            let (guard, timeout_result) = self
                .inner
                .condvar
                .wait_timeout(state, remaining)
                .unwrap();
            state = guard;
            if timeout_result.timed_out() {
                // Loop once more: we might have been woken right at the
                // deadline and still have a cell waiting, or disabled
                // right as we timed out.
                let now = self.inner.clock.now();
                if state.disabled {
                    return Err(Error::Disabled);
                }
                if now >= deadline {
                    return Err(Error::GetResourceTimeout);
                }
            }
        }
    }

    /// Disables the pool: all current and future `get` calls fail with
    /// [`Error::Disabled`]. Idempotent.
    pub fn disable(&self) {
        #[cfg(feature = "tracing")]
        tracing::debug!("pool disabled");
        self.inner.state.lock().unwrap().disabled = true;
        self.inner.condvar.notify_all();
    }

    /// Invalidates every cell: available cells are wasted; leased
    /// cells are flagged to waste on their next return.
    pub fn invalidate(&self) {
        self.inner.state.lock().unwrap().storage.invalidate();
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_rejected() {
        let result = Pool::<u32>::builder(0).build();
        assert!(matches!(result, Err(Error::ZeroPoolCapacity)));
    }

    #[test]
    fn lease_install_recycle_roundtrip() {
        let pool = Pool::<u32>::builder(1).build().unwrap();
        {
            let mut handle = pool.get_auto_recycle(Duration::from_millis(100)).unwrap();
            assert!(handle.empty());
            handle.reset(7).unwrap();
            assert_eq!(*handle.get().unwrap(), 7);
        }
        assert_eq!(pool.stats().available, 1);
        let handle = pool.get_auto_recycle(Duration::from_millis(100)).unwrap();
        assert_eq!(*handle.get().unwrap(), 7);
    }

    #[test]
    fn timeout_when_exhausted() {
        let pool = Pool::<u32>::builder(1).build().unwrap();
        let _first = pool.get_auto_recycle(Duration::from_millis(10)).unwrap();
        let second = pool.get_auto_recycle(Duration::from_millis(10));
        assert!(matches!(second, Err(Error::GetResourceTimeout)));
    }

    #[test]
    fn waste_discards_payload() {
        let pool = Pool::<u32>::builder(1).build().unwrap();
        {
            let mut handle = pool.get_auto_waste(Duration::from_millis(100)).unwrap();
            handle.reset(9).unwrap();
        }
        assert_eq!(pool.stats().wasted, 1);
        assert_eq!(pool.stats().available, 0);
    }

    #[test]
    fn disable_is_idempotent_and_rejects_get() {
        let pool = Pool::<u32>::builder(1).build().unwrap();
        pool.disable();
        pool.disable();
        let result = pool.get_auto_recycle(Duration::from_millis(10));
        assert!(matches!(result, Err(Error::Disabled)));
    }

    #[test]
    fn recycle_unblocks_a_waiting_thread() {
        use std::thread;

        let pool = Pool::<u32>::builder(1).build().unwrap();
        let handle = pool.get_auto_recycle(Duration::from_millis(50)).unwrap();
        let waiter_pool = pool.clone();
        let waiter = thread::spawn(move || {
            waiter_pool.get_auto_recycle(Duration::from_secs(5))
        });
        thread::sleep(Duration::from_millis(20));
        drop(handle);
        let result = waiter.join().unwrap();
        assert!(result.is_ok());
    }
}
