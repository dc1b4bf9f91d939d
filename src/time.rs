//! Monotonic time abstractions used throughout the pool.
//!
//! The pool never reads the wall clock directly; every timestamp flows
//! through a [`Clock`] so that tests can substitute a deterministic one.

use std::time::{Duration, Instant};

/// A source of monotonic instants.
///
/// Injected into both pool flavors so their notion of "now" can be
/// swapped out in tests without touching the real system clock.
pub trait Clock: Send + Sync {
    /// Returns the current monotonic instant.
    fn now(&self) -> Instant;
}

/// The default [`Clock`], backed by [`std::time::Instant`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Adds `duration` to `instant`, saturating at the representable
/// extremes instead of panicking on overflow.
///
/// `Duration::MAX` is the idiom used throughout this crate to mean
/// "forever"; saturating addition is what makes that idiom safe to
/// feed into [`Instant`] arithmetic.
pub fn saturating_add(instant: Instant, duration: Duration) -> Instant {
    instant.checked_add(duration).unwrap_or(far_future())
}

/// A sufficiently distant instant to stand in for "forever."
///
/// Used wherever a `Duration::MAX` idle timeout or lifespan is in
/// effect. `Instant` has no public constructor for its true maximum
/// value, and `Instant::now().checked_add(Duration::MAX)` always
/// overflows (any real `now()` plus the full `Duration` range exceeds
/// what `Instant` can represent), so that doesn't work as a derivation
/// — it silently collapses back to `now()`. Thirty years out is the
/// same fixed-horizon idiom `tokio::time::Instant` uses internally for
/// its own "far future" sentinel, and is far enough past any real
/// deadline this crate will ever be asked to honor.
pub fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86_400 * 365 * 30)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturating_add_forever_does_not_panic() {
        let now = Instant::now();
        let future = saturating_add(now, Duration::MAX);
        assert!(future >= now);
        // Must land genuinely far out, not collapse back to ~now.
        assert!(future >= now + Duration::from_secs(86_400 * 365));
    }

    #[test]
    fn saturating_add_normal_duration() {
        let now = Instant::now();
        let future = saturating_add(now, Duration::from_secs(5));
        assert!(future > now);
        assert!(future < far_future());
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
