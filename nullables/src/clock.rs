//! Nullable clock: deterministic time for testing.

use hopestream_types::{Clock, Timestamp};
use std::cell::Cell;

/// A deterministic clock.
///
/// Time only advances when you tell it to, and never moves backwards.
#[derive(Debug, Default)]
pub struct NullClock {
    current: Cell<u64>,
}

impl NullClock {
    pub fn new(initial_secs: u64) -> Self {
        Self {
            current: Cell::new(initial_secs),
        }
    }

    /// Advance time by a number of seconds.
    pub fn advance(&self, secs: u64) {
        self.current.set(self.current.get().saturating_add(secs));
    }

    /// Jump to `secs`. Earlier targets are ignored.
    pub fn set(&self, secs: u64) {
        if secs > self.current.get() {
            self.current.set(secs);
        }
    }
}

impl Clock for NullClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.current.get())
    }
}

impl Clock for &NullClock {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
