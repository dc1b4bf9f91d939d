//! Non-blocking, callback-based pool.
//!
//! `get` never blocks the calling thread. Instead the caller supplies
//! a continuation (`FnOnce(Result<Handle<T>, Error>) + Send`) that the
//! pool invokes once a cell is available, the wait times out, or the
//! pool is disabled. An `Arc<dyn Executor>` accompanies every call so
//! the pool knows how to run that continuation — the pool itself never
//! assumes a particular async runtime.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use respool::r#async::Pool;
//! use respool::runtime::{TokioExecutor, TokioTimer};
//!
//! # async fn example() {
//! let pool = Pool::<String>::builder(4)
//!     .timer(Arc::new(TokioTimer::current()))
//!     .build()
//!     .unwrap();
//! let executor = Arc::new(TokioExecutor::current());
//! let handle = pool.get_future(executor, Duration::from_secs(1)).await;
//! # let _ = handle;
//! # }
//! ```

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::config::PoolConfig;
use crate::error::Error;
use crate::executor::{Executor, Timer};
use crate::handle::{Handle, PoolReturns, Strategy};
use crate::queue::{PendingQueue, PushOutcome};
use crate::storage::{CellIndex, Storage, StorageStats};
use crate::time::{saturating_add, Clock, SystemClock};

type Continuation<T> = Box<dyn FnOnce(Result<Handle<T>, Error>) + Send>;

struct Inner<T: Send + 'static> {
    storage: Mutex<Storage<T>>,
    // Also the sole authority on whether the pool is disabled — see
    // `PendingQueue`'s doc comment for why that flag lives there and
    // not in a separate `Mutex<bool>` here.
    queue: Arc<PendingQueue<T>>,
    clock: Arc<dyn Clock>,
    weak_self: Weak<Inner<T>>,
}

impl<T: Send + 'static> Inner<T> {
    /// An `Arc<dyn PoolReturns<T>>` pointing at this same `Inner`,
    /// obtained via the weak self-reference it was constructed with.
    fn self_handle(&self) -> Arc<dyn PoolReturns<T>> {
        self.weak_self
            .upgrade()
            .expect("pool inner dropped while a handle referencing it still exists")
    }
}

impl<T: Send + 'static> PoolReturns<T> for Inner<T> {
    fn recycle(&self, cell: CellIndex, value: T) {
        if let Some((continuation, executor, strategy)) = self.queue.pop() {
            let valid = {
                let storage = self.storage.lock().unwrap();
                storage.is_valid(cell, self.clock.now())
            };
            let delivered = if valid { Some(value) } else { None };
            let handle = self.self_handle();
            let out = Handle::new(handle, cell, delivered, strategy);
            #[cfg(feature = "tracing")]
            tracing::debug!(cell = cell.0, "serving queued waiter on recycle");
            executor.post(Box::new(move || continuation(Ok(out))));
            return;
        }
        let now = self.clock.now();
        self.storage.lock().unwrap().recycle(cell, value, now);
    }

    fn waste(&self, cell: CellIndex) {
        #[cfg(feature = "tracing")]
        tracing::debug!(cell = cell.0, "wasting cell");
        if let Some((continuation, executor, strategy)) = self.queue.pop() {
            let handle = self.self_handle();
            let out = Handle::new(handle, cell, None, strategy);
            #[cfg(feature = "tracing")]
            tracing::debug!(cell = cell.0, "serving queued waiter on waste");
            executor.post(Box::new(move || continuation(Ok(out))));
            return;
        }
        self.storage.lock().unwrap().waste(cell);
    }

    fn mark_reset(&self, cell: CellIndex) {
        let now = self.clock.now();
        self.storage.lock().unwrap().mark_reset(cell, now);
    }
}

/// A generic, bounded, non-blocking resource pool.
///
/// Cloning a `Pool` is cheap: it shares its inner state via an [`Arc`].
pub struct Pool<T: Send + 'static> {
    inner: Arc<Inner<T>>,
}

impl<T: Send + 'static> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Pool {
            inner: self.inner.clone(),
        }
    }
}

/// Builds a [`Pool`], optionally seeding it with initial values and
/// non-default capability implementations.
pub struct Builder<T> {
    capacity: usize,
    idle_timeout: Duration,
    lifespan: Duration,
    queue_capacity: usize,
    clock: Arc<dyn Clock>,
    timer: Option<Arc<dyn Timer>>,
    seed: Option<Box<dyn FnOnce(Duration, Duration) -> Storage<T>>>,
}

impl<T: Send + 'static> Builder<T> {
    fn new(capacity: usize) -> Self {
        Builder {
            capacity,
            idle_timeout: Duration::MAX,
            lifespan: Duration::MAX,
            queue_capacity: 0,
            clock: Arc::new(SystemClock),
            timer: None,
            seed: None,
        }
    }

    /// Applies every field of `value` onto this builder, overwriting
    /// whatever capacity/timeout/queue settings were set before it.
    /// Mirrors the teacher's `managed::Builder::config`.
    pub fn config(mut self, value: PoolConfig) -> Self {
        self.capacity = value.capacity;
        self.idle_timeout = value.idle_timeout;
        self.lifespan = value.lifespan;
        self.queue_capacity = value.queue_capacity;
        self
    }

    pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn lifespan(mut self, lifespan: Duration) -> Self {
        self.lifespan = lifespan;
        self
    }

    /// Sets how many waiters may queue once the pool is exhausted.
    /// Zero (the default) means `get` never enqueues: once its own
    /// wait duration is exhausted without a cell becoming free, it
    /// fails immediately rather than ever queueing.
    pub fn queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Injects the [`Timer`] used to expire queued waiters. Required
    /// unless `rt_tokio_1` supplies one via
    /// [`crate::runtime::TokioTimer`].
    pub fn timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Pre-populates the pool from an exact-size iterator of values.
    /// The iterator's length becomes the pool's capacity.
    pub fn with_values<I>(mut self, iter: I) -> Self
    where
        I: IntoIterator<Item = T> + 'static,
        I::IntoIter: ExactSizeIterator,
    {
        self.capacity = 0;
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
        let timer = self
            .timer
            .expect("a Timer capability must be supplied via Builder::timer");
        let capacity = storage.capacity();
        let queue = PendingQueue::new(self.queue_capacity, timer);
        #[cfg(feature = "tracing")]
        tracing::debug!(capacity, "pool constructed");
        Ok(Pool {
            inner: Arc::new_cyclic(|weak_self| Inner {
                storage: Mutex::new(storage),
                queue,
                clock: self.clock,
                weak_self: weak_self.clone(),
            }),
        })
    }
}

impl<T: Send + 'static> Pool<T> {
    pub fn builder(capacity: usize) -> Builder<T> {
        Builder::new(capacity)
    }

    pub fn capacity(&self) -> usize {
        self.inner.storage.lock().unwrap().capacity()
    }

    /// Lane occupancy plus the number of currently queued waiters.
    pub fn stats(&self) -> (StorageStats, usize) {
        (
            self.inner.storage.lock().unwrap().stats(),
            self.inner.queue.len(),
        )
    }

    /// Requests a cell, delivering the outcome to `continuation`
    /// through `executor` rather than blocking. The resulting
    /// handle recycles on return.
    pub fn get_auto_recycle(
        &self,
        executor: Arc<dyn Executor>,
        wait: Duration,
        continuation: Continuation<T>,
    ) {
        self.get(executor, wait, Strategy::Recycle, continuation)
    }

    /// Like [`Pool::get_auto_recycle`], but the resulting handle wastes
    /// its cell on return instead of recycling it.
    pub fn get_auto_waste(
        &self,
        executor: Arc<dyn Executor>,
        wait: Duration,
        continuation: Continuation<T>,
    ) {
        self.get(executor, wait, Strategy::Waste, continuation)
    }

    /// Convenience wrapper around [`Pool::get_auto_recycle`] returning
    /// a `Future` via an internal one-shot channel, for callers who'd
    /// rather `.await` than hand-write a continuation. The pool's
    /// actual contract remains the callback one; this is a thin
    /// adapter on top of it.
    pub async fn get_future(
        &self,
        executor: Arc<dyn Executor>,
        wait: Duration,
    ) -> Result<Handle<T>, Error> {
        let (tx, rx) = oneshot::channel();
        self.get_auto_recycle(
            executor,
            wait,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        );
        rx.await
            .expect("pool dropped the continuation without ever invoking it")
    }

    fn get(
        &self,
        executor: Arc<dyn Executor>,
        wait: Duration,
        strategy: Strategy,
        continuation: Continuation<T>,
    ) {
        if self.inner.queue.is_disabled() {
            executor.dispatch(Box::new(move || continuation(Err(Error::Disabled))));
            return;
        }
        let now = self.inner.clock.now();
        let leased = self.inner.storage.lock().unwrap().lease(now);
        if let Some((cell, value)) = leased {
            let handle: Arc<dyn PoolReturns<T>> = self.inner.clone();
            let out = Handle::new(handle, cell, value, strategy);
            executor.post(Box::new(move || continuation(Ok(out))));
            return;
        }
        if wait == Duration::ZERO {
            executor.post(Box::new(move || continuation(Err(Error::GetResourceTimeout))));
            return;
        }
        let deadline = saturating_add(now, wait);
        // `push` checks `disabled` and registers the waiter under the
        // same lock acquisition, so a `disable()` racing this call can
        // never drain before this waiter is registered and then leave
        // it stranded in the queue.
        match self.inner.queue.push(continuation, executor, strategy, deadline) {
            PushOutcome::Enqueued => {}
            PushOutcome::Disabled(continuation, executor) => {
                executor.dispatch(Box::new(move || continuation(Err(Error::Disabled))));
            }
            PushOutcome::Overflow(continuation, executor) => {
                executor.post(Box::new(move || {
                    continuation(Err(Error::RequestQueueOverflow))
                }));
            }
        }
    }

    /// Disables the pool: every current and future `get` fails with
    /// [`Error::Disabled`]; all currently queued waiters are drained
    /// and dispatched with that same error.
    pub fn disable(&self) {
        #[cfg(feature = "tracing")]
        tracing::debug!("pool disabled");
        for (continuation, executor) in self.inner.queue.disable() {
            executor.dispatch(Box::new(move || continuation(Err(Error::Disabled))));
        }
    }

    /// Invalidates every cell: available cells are wasted; leased
    /// cells are flagged to waste on their next return.
    pub fn invalidate(&self) {
        self.inner.storage.lock().unwrap().invalidate();
    }
}

impl<T: Send + 'static> Drop for Inner<T> {
    fn drop(&mut self) {
        for (continuation, executor) in self.queue.disable() {
            executor.dispatch(Box::new(move || continuation(Err(Error::Disabled))));
        }
    }
}
