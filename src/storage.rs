//! The three-lane arena that backs both pool flavors.

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use crate::cell::Cell;
use crate::time::saturating_add;

/// Snapshot of a [`Storage`]'s lane occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    pub available: usize,
    pub used: usize,
    pub wasted: usize,
}

impl StorageStats {
    pub fn capacity(&self) -> usize {
        self.available + self.used + self.wasted
    }
}

/// Opaque handle to an arena slot. Stable for the slot's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct CellIndex(pub(crate) usize);

/// Fixed-size arena of cells plus three FIFO/membership lanes.
///
/// `available` and `wasted` are `VecDeque<usize>` so `lease` can pop the
/// oldest entry and `recycle`/`waste` can push to the back, giving FIFO
/// reuse order. `used` is a `HashSet<usize>` because nothing needs
/// arrival order for leased cells, only membership tests and, for
/// `invalidate`, a single unordered pass over every member.
pub(crate) struct Storage<T> {
    arena: Vec<Cell<T>>,
    available: VecDeque<usize>,
    used: HashSet<usize>,
    wasted: VecDeque<usize>,
    idle_timeout: Duration,
    lifespan: Duration,
}

impl<T> Storage<T> {
    pub(crate) fn new(capacity: usize, idle_timeout: Duration, lifespan: Duration) -> Self {
        let now = Instant::now();
        let arena = (0..capacity).map(|_| Cell::empty(now)).collect();
        Storage {
            arena,
            available: VecDeque::with_capacity(capacity),
            used: HashSet::with_capacity(capacity),
            wasted: (0..capacity).collect(),
            idle_timeout,
            lifespan,
        }
    }

    pub(crate) fn seeded<I>(
        iter: I,
        idle_timeout: Duration,
        lifespan: Duration,
    ) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let now = Instant::now();
        let iter = iter.into_iter();
        let capacity = iter.len();
        let drop_time = saturating_add(now, idle_timeout.min(lifespan));
        let mut arena = Vec::with_capacity(capacity);
        let mut available = VecDeque::with_capacity(capacity);
        for (i, value) in iter.enumerate() {
            arena.push(Cell::new(value, now, drop_time));
            available.push_back(i);
        }
        Storage {
            arena,
            available,
            used: HashSet::with_capacity(capacity),
            wasted: VecDeque::new(),
            idle_timeout,
            lifespan,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.arena.len()
    }

    pub(crate) fn stats(&self) -> StorageStats {
        StorageStats {
            available: self.available.len(),
            used: self.used.len(),
            wasted: self.wasted.len(),
        }
    }

    /// Leases a cell, preferring a still-fresh available cell over an
    /// empty wasted slot. Discards stale available cells as it walks
    /// past them. Returns `None` only when every cell is leased out.
    pub(crate) fn lease(&mut self, now: Instant) -> Option<(CellIndex, Option<T>)> {
        while let Some(&idx) = self.available.front() {
            if self.arena[idx].drop_time > now {
                self.available.pop_front();
                self.used.insert(idx);
                let value = self.arena[idx].value.take();
                return Some((CellIndex(idx), value));
            }
            // Stale: discard the payload and move the slot to wasted.
            self.available.pop_front();
            self.arena[idx].value = None;
            self.wasted.push_back(idx);
        }
        if let Some(idx) = self.wasted.pop_front() {
            self.arena[idx].waste_on_recycle = false;
            self.used.insert(idx);
            return Some((CellIndex(idx), None));
        }
        None
    }

    /// Returns `cell` to the pool with `value` installed, subject to
    /// the waste-on-recycle flag and lifespan expiry.
    pub(crate) fn recycle(&mut self, cell: CellIndex, value: T, now: Instant) {
        debug_assert!(self.used.contains(&cell.0));
        self.arena[cell.0].value = Some(value);
        if self.arena[cell.0].waste_on_recycle || self.is_expired(cell, now) {
            self.waste(cell);
            return;
        }
        let drop_time = saturating_add(
            now,
            self.idle_timeout
                .min(self.lifespan_remaining(cell, now)),
        );
        self.arena[cell.0].drop_time = drop_time;
        self.used.remove(&cell.0);
        self.available.push_back(cell.0);
    }

    /// Drops whatever payload `cell` currently holds and returns the
    /// slot to the wasted lane, empty.
    pub(crate) fn waste(&mut self, cell: CellIndex) {
        #[cfg(feature = "tracing")]
        tracing::trace!(cell = cell.0, "cell wasted");
        self.arena[cell.0].value = None;
        self.arena[cell.0].waste_on_recycle = false;
        self.used.remove(&cell.0);
        self.wasted.push_back(cell.0);
    }

    pub(crate) fn is_valid(&self, cell: CellIndex, now: Instant) -> bool {
        !self.arena[cell.0].waste_on_recycle && !self.is_expired(cell, now)
    }

    fn is_expired(&self, cell: CellIndex, now: Instant) -> bool {
        now >= saturating_add(self.arena[cell.0].reset_time, self.lifespan)
    }

    fn lifespan_remaining(&self, cell: CellIndex, now: Instant) -> Duration {
        saturating_add(self.arena[cell.0].reset_time, self.lifespan)
            .saturating_duration_since(now)
    }

    /// Invalidates every cell: available payloads are dropped and their
    /// slots moved to wasted; used cells are flagged so their next
    /// `recycle` behaves like a `waste`.
    pub(crate) fn invalidate(&mut self) {
        while let Some(idx) = self.available.pop_front() {
            self.arena[idx].value = None;
            self.wasted.push_back(idx);
        }
        for &idx in &self.used {
            self.arena[idx].waste_on_recycle = true;
        }
    }

    /// Installs `value` into `cell` and stamps its reset time, as part
    /// of `Handle::reset`.
    pub(crate) fn mark_reset(&mut self, cell: CellIndex, now: Instant) {
        self.arena[cell.0].reset_time = now;
        self.arena[cell.0].waste_on_recycle = false;
    }
}
