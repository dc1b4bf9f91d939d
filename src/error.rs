use std::fmt;

/// Errors produced by the pool and its handles.
///
/// This pool never constructs resources itself, so there is no
/// backend-specific error type to thread through: every failure mode
/// is enumerated here directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// `get` did not obtain a cell before its deadline elapsed.
    GetResourceTimeout,
    /// An async `get` could not be enqueued because the pending-request
    /// queue was already at capacity (or has zero capacity).
    RequestQueueOverflow,
    /// The operation was issued against a pool that has been disabled.
    Disabled,
    /// A pool was constructed with a capacity of zero.
    ZeroPoolCapacity,
    /// `Handle::get`/`get_mut` was called on a handle with no payload.
    EmptyHandle,
    /// A handle operation was attempted after the handle had already
    /// been consumed by an explicit `recycle`/`waste`/`reset`.
    UnusableHandle,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetResourceTimeout => write!(f, "timed out waiting for a pool resource"),
            Self::RequestQueueOverflow => write!(f, "pending-request queue is full"),
            Self::Disabled => write!(f, "pool is disabled"),
            Self::ZeroPoolCapacity => write!(f, "pool capacity must be greater than zero"),
            Self::EmptyHandle => write!(f, "handle has no payload"),
            Self::UnusableHandle => write!(f, "handle has already been returned to the pool"),
        }
    }
}

impl std::error::Error for Error {}
