//! Monotonic microsecond clock, with a mockable deterministic variant for tests.

use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::mock;

/// A source of monotonically non-decreasing microsecond timestamps.
pub trait Clock: Send + Sync {
    /// Returns the current timestamp, in microseconds.
    fn now_micros(&self) -> u64;
}

static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// The real wall-clock [`Clock`], backed by [`std::time::Instant`].
///
/// Every instance shares the same process-wide epoch, so timestamps produced
/// by distinct `RealClock` values remain comparable.
#[derive(Clone, Copy, Debug, Default)]
pub struct RealClock;

impl Clock for RealClock {
    fn now_micros(&self) -> u64 {
        EPOCH.elapsed().as_micros() as u64
    }
}

/// A deterministic [`Clock`] for tests: starts at 0 and increments by 1 on
/// every observation.
///
/// This is the clock the reference backend switches to when
/// [`mock::enable`](crate::mock::enable) has been called.
#[derive(Debug, Default)]
pub struct MockClock {
    next: AtomicU64,
}

impl MockClock {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }
}

impl Clock for MockClock {
    fn now_micros(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// Returns the process's real clock or the mock clock, depending on whether
/// [`mock::enable`](crate::mock::enable) has been called.
///
/// Backends that need a single shared clock for their whole lifetime should
/// call this once at construction time, not per-event: the mock clock's
/// counter is process-wide and shared by `default_clock()`'s callers, so
/// repeated calls would not "restart" a session's timestamps at 0.
pub fn default_clock() -> std::sync::Arc<dyn Clock> {
    static MOCK: Lazy<std::sync::Arc<MockClock>> = Lazy::new(|| std::sync::Arc::new(MockClock::new()));
    if mock::is_enabled() {
        MOCK.clone()
    } else {
        std::sync::Arc::new(RealClock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_clock_increments_by_one_from_zero() {
        let clock = MockClock::new();
        assert_eq!(clock.now_micros(), 0);
        assert_eq!(clock.now_micros(), 1);
        assert_eq!(clock.now_micros(), 2);
    }

    #[test]
    fn real_clock_is_monotonic() {
        let clock = RealClock;
        let a = clock.now_micros();
        let b = clock.now_micros();
        assert!(b >= a);
    }
}
