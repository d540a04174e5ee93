use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};
use time::{Duration, OffsetDateTime};

/// Source of "now" for everything that depends on message lifetimes.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Wraps another clock and never reports an instant earlier than one it already reported.
///
/// Expiry is evaluated against this clock, so a wall clock stepping backwards cannot make an
/// expired message readable again.
#[derive(Debug)]
pub struct MonotonicClock<C> {
    inner: C,
    high_water: Mutex<Option<OffsetDateTime>>,
}

impl<C: Clock> MonotonicClock<C> {
    #[must_use]
    pub const fn new(inner: C) -> Self {
        Self { inner, high_water: Mutex::new(None) }
    }
}

impl<C: Clock> Clock for MonotonicClock<C> {
    fn now(&self) -> OffsetDateTime {
        let observed = self.inner.now();
        let mut high_water = self.high_water.lock().unwrap_or_else(PoisonError::into_inner);
        let now = high_water.map_or(observed, |prev| prev.max(observed));
        *high_water = Some(now);
        now
    }
}

/// A hand-driven clock for tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    #[must_use]
    pub const fn new(start: OffsetDateTime) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    pub fn set(&self, to: OffsetDateTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(OffsetDateTime::now_utc())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clock + ?Sized> Clock for std::sync::Arc<T> {
    fn now(&self) -> OffsetDateTime {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_manual_clock_advances() {
        let start = OffsetDateTime::UNIX_EPOCH;
        let clock = ManualClock::new(start);
        clock.advance(Duration::seconds(61));
        assert_eq!(clock.now(), start + Duration::seconds(61));
    }

    #[test]
    fn test_monotonic_clock_ignores_backwards_steps() {
        let start = OffsetDateTime::UNIX_EPOCH + Duration::days(1);
        let manual = Arc::new(ManualClock::new(start));
        let clock = MonotonicClock::new(Arc::clone(&manual));

        assert_eq!(clock.now(), start);

        manual.set(start - Duration::hours(2));
        assert_eq!(clock.now(), start, "clock must not move backwards");

        manual.set(start + Duration::minutes(5));
        assert_eq!(clock.now(), start + Duration::minutes(5));
    }
}
