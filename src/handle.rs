//! The one-shot borrow token handed back by a successful `get`.

use std::sync::Arc;

use crate::error::Error;
use crate::storage::CellIndex;

/// Capability shared by the sync and async pool internals for
/// returning a leased cell.
///
/// Modeled as a small trait rather than an inheritance hierarchy (the
/// C++ original's `pool_returns<T>` abstract base). [`Handle`] stores
/// its pool as `Arc<dyn PoolReturns<T>>`, so it is not generic over
/// which pool flavor produced it.
pub(crate) trait PoolReturns<T>: Send + Sync {
    fn recycle(&self, cell: CellIndex, value: T);
    fn waste(&self, cell: CellIndex);
    fn mark_reset(&self, cell: CellIndex);
}

/// Which disposition a handle applies to its cell when it is returned,
/// whether explicitly or via `Drop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Strategy {
    Recycle,
    Waste,
}

/// A single borrow of one cell from a pool.
///
/// Holds a strong [`Arc`] to the pool's shared inner state — not a
/// [`std::sync::Weak`] one — so the pool's storage and (for the async
/// flavor) pending-request queue stay alive for as long as any handle
/// derived from it does.
///
/// `Handle` is not `Clone`. Its `Drop` impl performs the automatic
/// return under the strategy fixed at construction, unless an explicit
/// [`Handle::recycle`] or [`Handle::waste`] already consumed it.
pub struct Handle<T> {
    pool: Arc<dyn PoolReturns<T>>,
    cell: CellIndex,
    value: Option<T>,
    strategy: Strategy,
    consumed: bool,
}

impl<T> Handle<T> {
    pub(crate) fn new(
        pool: Arc<dyn PoolReturns<T>>,
        cell: CellIndex,
        value: Option<T>,
        strategy: Strategy,
    ) -> Self {
        Handle {
            pool,
            cell,
            value,
            strategy,
            consumed: false,
        }
    }

    /// True if this handle currently holds no payload (leased from a
    /// wasted slot, or delivered to an async waiter as an empty cell).
    pub fn empty(&self) -> bool {
        self.value.is_none()
    }

    /// Borrows the payload.
    ///
    /// # Errors
    /// Returns [`Error::EmptyHandle`] if [`Handle::empty`] is true.
    pub fn get(&self) -> Result<&T, Error> {
        self.value.as_ref().ok_or(Error::EmptyHandle)
    }

    /// Mutably borrows the payload.
    ///
    /// # Errors
    /// Returns [`Error::EmptyHandle`] if [`Handle::empty`] is true.
    pub fn get_mut(&mut self) -> Result<&mut T, Error> {
        self.value.as_mut().ok_or(Error::EmptyHandle)
    }

    /// Installs (or replaces) the payload and stamps this cell's reset
    /// time, clearing any pending waste-on-recycle flag.
    ///
    /// # Errors
    /// Returns [`Error::UnusableHandle`] if the handle was already
    /// consumed by a prior `recycle`/`waste`.
    pub fn reset(&mut self, value: T) -> Result<(), Error> {
        if self.consumed {
            return Err(Error::UnusableHandle);
        }
        self.value = Some(value);
        self.pool.mark_reset(self.cell);
        Ok(())
    }

    /// Explicitly returns this handle's cell for reuse, applying the
    /// recycle disposition regardless of the strategy it was created
    /// with.
    ///
    /// Takes `&mut self` rather than consuming the handle outright so
    /// that a second call (or a later `Drop`) observes
    /// [`Error::UnusableHandle`]/becomes a no-op instead of being
    /// rejected by the borrow checker before it can report anything.
    ///
    /// # Errors
    /// Returns [`Error::UnusableHandle`] if already consumed.
    pub fn recycle(&mut self) -> Result<(), Error> {
        self.consume()?;
        if let Some(value) = self.value.take() {
            self.pool.recycle(self.cell, value);
        } else {
            // No payload to recycle with; the cell goes back empty.
            self.pool.waste(self.cell);
        }
        Ok(())
    }

    /// Explicitly discards this handle's cell, dropping its payload.
    ///
    /// # Errors
    /// Returns [`Error::UnusableHandle`] if already consumed.
    pub fn waste(&mut self) -> Result<(), Error> {
        self.consume()?;
        self.value = None;
        self.pool.waste(self.cell);
        Ok(())
    }

    fn consume(&mut self) -> Result<(), Error> {
        if self.consumed {
            return Err(Error::UnusableHandle);
        }
        self.consumed = true;
        Ok(())
    }
}

impl<T> Drop for Handle<T> {
    fn drop(&mut self) {
        if self.consumed {
            return;
        }
        self.consumed = true;
        match (self.strategy, self.value.take()) {
            (Strategy::Recycle, Some(value)) => self.pool.recycle(self.cell, value),
            (Strategy::Recycle, None) => self.pool.waste(self.cell),
            (Strategy::Waste, _) => self.pool.waste(self.cell),
        }
    }
}
