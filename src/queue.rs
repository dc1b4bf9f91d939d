//! Bounded FIFO of async waiters with per-request expiry, used only by
//! the async pool.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, Weak};
use std::time::Instant;

use crate::error::Error;
use crate::executor::{Executor, Timer};
use crate::handle::{Handle, Strategy};

type Continuation<T> = Box<dyn FnOnce(Result<Handle<T>, Error>) + Send>;

struct Waiter<T> {
    continuation: Continuation<T>,
    executor: Arc<dyn Executor>,
    strategy: Strategy,
    deadline: Instant,
}

/// Outcome of [`PendingQueue::push`].
pub(crate) enum PushOutcome<T> {
    Enqueued,
    /// The queue had already been disabled; handed back unregistered.
    Disabled(Continuation<T>, Arc<dyn Executor>),
    /// The queue was at capacity; handed back unregistered.
    Overflow(Continuation<T>, Arc<dyn Executor>),
}

struct Inner<T> {
    order: VecDeque<u64>,
    waiters: HashMap<u64, Waiter<T>>,
    by_deadline: BTreeMap<Instant, Vec<u64>>,
    next_id: u64,
    capacity: usize,
    armed_deadline: Option<Instant>,
    disabled: bool,
}

impl<T> Inner<T> {
    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Queue of waiters awaiting a cell, ordered by arrival with a single
/// timer tracking the earliest outstanding deadline.
///
/// Also the sole authority on whether the pool has been disabled: the
/// disabled flag lives under the same lock as waiter registration, so
/// a `push` and a concurrent `disable` can never interleave such that
/// the pushed waiter is registered after `disable`'s drain has already
/// run and is then left stranded until its own deadline.
///
/// The scheduled timer callback holds only a [`Weak`] reference to this
/// queue (via [`Arc::new_cyclic`]) so an expiring queue is never kept
/// alive by a pending timer fire.
pub(crate) struct PendingQueue<T> {
    inner: Mutex<Inner<T>>,
    timer: Arc<dyn Timer>,
    self_ref: Weak<PendingQueue<T>>,
}

impl<T: Send + 'static> PendingQueue<T> {
    pub(crate) fn new(capacity: usize, timer: Arc<dyn Timer>) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| PendingQueue {
            inner: Mutex::new(Inner {
                order: VecDeque::new(),
                waiters: HashMap::new(),
                by_deadline: BTreeMap::new(),
                next_id: 0,
                capacity,
                armed_deadline: None,
                disabled: false,
            }),
            timer,
            self_ref: self_ref.clone(),
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn is_disabled(&self) -> bool {
        self.inner.lock().unwrap().disabled
    }

    /// Enqueues a waiter with an absolute `deadline`. Checking
    /// `disabled` and registering the waiter happen under the same
    /// lock acquisition, so this can never race with [`PendingQueue::disable`]
    /// the way two separately-locked flags could.
    pub(crate) fn push(
        &self,
        continuation: Continuation<T>,
        executor: Arc<dyn Executor>,
        strategy: Strategy,
        deadline: Instant,
    ) -> PushOutcome<T> {
        let mut inner = self.inner.lock().unwrap();
        if inner.disabled {
            return PushOutcome::Disabled(continuation, executor);
        }
        if inner.len() >= inner.capacity {
            return PushOutcome::Overflow(continuation, executor);
        }
        let id = inner.next_id;
        inner.next_id = inner.next_id.wrapping_add(1);
        inner.order.push_back(id);
        inner.by_deadline.entry(deadline).or_default().push(id);
        inner.waiters.insert(
            id,
            Waiter {
                continuation,
                executor,
                strategy,
                deadline,
            },
        );
        self.update_timer(&mut inner);
        PushOutcome::Enqueued
    }

    /// Pops the oldest waiter, if any, removing it from both the
    /// arrival order and the deadline index.
    pub(crate) fn pop(&self) -> Option<(Continuation<T>, Arc<dyn Executor>, Strategy)> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.order.pop_front()?;
        let waiter = inner.waiters.remove(&id).expect("waiter id must be present");
        remove_from_deadline_index(&mut inner.by_deadline, waiter.deadline, id);
        self.update_timer(&mut inner);
        Some((waiter.continuation, waiter.executor, waiter.strategy))
    }

    /// Atomically marks the queue disabled and removes every waiter
    /// currently queued, in arrival order. Any `push` that arrives
    /// after this call (even one already in flight, blocked on the
    /// same lock) observes `disabled` and is rejected rather than
    /// silently enqueued into a queue nothing will ever drain again.
    pub(crate) fn disable(&self) -> Vec<(Continuation<T>, Arc<dyn Executor>)> {
        let mut inner = self.inner.lock().unwrap();
        inner.disabled = true;
        inner.by_deadline.clear();
        inner.armed_deadline = None;
        inner
            .order
            .drain(..)
            .filter_map(|id| inner.waiters.remove(&id))
            .map(|w| (w.continuation, w.executor))
            .collect()
    }

    /// Timer-fired callback. Expires every waiter whose deadline is at
    /// or before `fired_for`, then dispatches each with
    /// `Error::GetResourceTimeout` through its own executor.
    ///
    /// Ignored if `fired_for` no longer matches the deadline the timer
    /// was last armed for — a newer `push`/`pop` already superseded it.
    fn expire(&self, fired_for: Instant) {
        let expired = {
            let mut inner = self.inner.lock().unwrap();
            if inner.armed_deadline != Some(fired_for) {
                return;
            }
            let mut expired = Vec::new();
            let due: Vec<Instant> = inner
                .by_deadline
                .range(..=fired_for)
                .map(|(k, _)| *k)
                .collect();
            for deadline in due {
                if let Some(ids) = inner.by_deadline.remove(&deadline) {
                    for id in ids {
                        inner.order.retain(|&o| o != id);
                        if let Some(w) = inner.waiters.remove(&id) {
                            expired.push(w);
                        }
                    }
                }
            }
            self.update_timer(&mut inner);
            expired
        };
        for waiter in expired {
            let Waiter {
                continuation,
                executor,
                ..
            } = waiter;
            #[cfg(feature = "tracing")]
            tracing::trace!("queued waiter timed out");
            executor.post(Box::new(move || continuation(Err(Error::GetResourceTimeout))));
        }
    }

    fn update_timer(&self, inner: &mut Inner<T>) {
        let next = inner.by_deadline.keys().next().copied();
        inner.armed_deadline = next;
        if let Some(deadline) = next {
            let weak = self.self_ref.clone();
            self.timer.schedule(
                deadline,
                Box::new(move || {
                    if let Some(queue) = weak.upgrade() {
                        queue.expire(deadline);
                    }
                }),
            );
        }
    }
}

fn remove_from_deadline_index(
    by_deadline: &mut BTreeMap<Instant, Vec<u64>>,
    deadline: Instant,
    id: u64,
) {
    if let Some(ids) = by_deadline.get_mut(&deadline) {
        ids.retain(|&x| x != id);
        if ids.is_empty() {
            by_deadline.remove(&deadline);
        }
    }
}
