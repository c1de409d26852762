//! Deterministic test doubles, gated behind the `test-util` feature.

use std::sync::Mutex;
use std::time::SystemTime;

use crate::clock::Clock;

/// A [`Clock`] whose `now()` is set explicitly by the test, rather than
/// reading the system clock, so freshness/staleness arithmetic is
/// reproducible.
pub struct FixedClock(Mutex<SystemTime>);

impl FixedClock {
    pub fn new(now: SystemTime) -> Self {
        FixedClock(Mutex::new(now))
    }

    pub fn set(&self, now: SystemTime) {
        *self.0.lock().unwrap() = now;
    }

    pub fn advance(&self, by: std::time::Duration) {
        let mut guard = self.0.lock().unwrap();
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        *self.0.lock().unwrap()
    }
}
