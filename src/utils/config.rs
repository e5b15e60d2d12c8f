//! Limits for configuration values.

use core::cmp;

//------------ DefMinMax -----------------------------------------------------

/// The default, minimum, and maximum values for a config variable.
#[derive(Clone, Copy, Debug)]
pub struct DefMinMax<T> {
    /// The default value,
    def: T,

    /// The minimum value,
    min: T,

    /// The maximum value,
    max: T,
}

impl<T> DefMinMax<T> {
    /// Creates a new value.
    pub const fn new(def: T, min: T, max: T) -> Self {
        Self { def, min, max }
    }

    /// Returns the default value.
    pub fn default(self) -> T {
        self.def
    }

    /// Trims the given value to fit into the minimum/maximum range.
    pub fn limit(self, value: T) -> T
    where
        T: Ord,
    {
        cmp::max(self.min, cmp::min(self.max, value))
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[test]
    fn limit() {
        const LIMIT: DefMinMax<usize> = DefMinMax::new(10, 1, 100);
        assert_eq!(LIMIT.default(), 10);
        assert_eq!(LIMIT.limit(0), 1);
        assert_eq!(LIMIT.limit(50), 50);
        assert_eq!(LIMIT.limit(1000), 100);
    }

    #[test]
    fn limit_duration() {
        const LIMIT: DefMinMax<Duration> = DefMinMax::new(
            Duration::from_secs(5),
            Duration::from_millis(100),
            Duration::from_secs(3600),
        );
        assert_eq!(
            LIMIT.limit(Duration::from_millis(10)),
            Duration::from_millis(100)
        );
        assert_eq!(
            LIMIT.limit(Duration::from_secs(7200)),
            Duration::from_secs(3600)
        );
    }
}
