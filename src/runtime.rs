//! Default [`Clock`], [`Timer`] and [`Executor`] implementations backed
//! by `tokio`, gated behind the `rt_tokio_1` feature. Nothing in the
//! rest of the crate depends on `tokio` unless this feature is on.

use std::time::Instant;

use crate::executor::{Executor, Timer};
use crate::time::Clock;

/// [`Clock`] backed by [`std::time::Instant`] (tokio has no distinct
/// monotonic clock type of its own to wrap).
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// [`Executor`] backed by a `tokio::runtime::Handle`.
///
/// `post` always spawns a fresh task. `dispatch` does the same — tokio
/// gives no portable way to detect "already on this runtime, safe to
/// run inline", so deferring is the conservative, always-correct
/// choice.
#[derive(Clone)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

impl TokioExecutor {
    /// Captures the handle of the runtime this is called from.
    ///
    /// # Panics
    /// Panics if called outside of a tokio runtime context, matching
    /// `tokio::runtime::Handle::current`'s own contract.
    pub fn current() -> Self {
        TokioExecutor {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl Executor for TokioExecutor {
    fn post(&self, f: Box<dyn FnOnce() + Send>) {
        self.handle.spawn(async move { f() });
    }
}

/// [`Timer`] backed by `tokio::time::sleep`.
#[derive(Clone)]
pub struct TokioTimer {
    handle: tokio::runtime::Handle,
}

impl TokioTimer {
    /// Captures the handle of the runtime this is called from.
    ///
    /// # Panics
    /// Panics if called outside of a tokio runtime context.
    pub fn current() -> Self {
        TokioTimer {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl Timer for TokioTimer {
    fn schedule(&self, at: Instant, callback: Box<dyn FnOnce() + Send>) {
        self.handle.spawn(async move {
            let now = Instant::now();
            if at > now {
                tokio::time::sleep(at - now).await;
            }
            callback();
        });
    }
}
