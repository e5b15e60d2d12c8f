//! A time interface that can be replaced by a fake time implementation
//! during testing.
//!
//! The resolver context never reads the system time directly. Instead, it
//! asks a [`Clock`] once at the start of every scheduling pass. This makes
//! it possible to drive retransmissions and timeouts deterministically by
//! using a [`FakeClock`].

use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

//------------ Clock ---------------------------------------------------------

/// A source of the current time.
pub trait Clock: Debug {
    /// Returns the current time.
    fn now(&self) -> Instant;
}

//------------ SystemClock ---------------------------------------------------

/// Implementation of the [Clock] trait using [`Instant::now`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

//------------ FakeClock -----------------------------------------------------

/// Implementation of the [Clock] trait to fake the passing of time, for
/// example for testing.
///
/// The clock starts at the instant it was created and only moves when
/// [`advance`][Self::advance] is called. Clones share the same time.
#[derive(Clone, Debug)]
pub struct FakeClock {
    /// The instant the clock was created.
    base: Instant,

    /// How far the clock has been moved since then.
    offset: Arc<Mutex<Duration>>,
}

impl FakeClock {
    /// Creates a new fake clock.
    pub fn new() -> Self {
        FakeClock {
            base: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Moves the clock forward by `adjust`.
    pub fn advance(&self, adjust: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset = offset.saturating_add(adjust);
    }

    /// Returns how far the clock has been moved since it was created.
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed()
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fake_clock_is_shared() {
        let clock = FakeClock::new();
        let other = clock.clone();
        let start = clock.now();
        other.advance(Duration::from_millis(1500));
        assert_eq!(clock.now() - start, Duration::from_millis(1500));
        assert_eq!(clock.elapsed(), Duration::from_millis(1500));
    }

    #[test]
    fn fake_clock_stands_still() {
        let clock = FakeClock::new();
        assert_eq!(clock.now(), clock.now());
    }
}
