//! Injectable wall-clock used to stamp observations.

use std::sync::Mutex;

use crate::UtcDateTime;

/// Time source seam so fetch stamping is deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> UtcDateTime;
}

/// Production clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UtcDateTime {
        UtcDateTime::now()
    }
}

/// Deterministic clock that returns a preset instant, advanceable by tests.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<UtcDateTime>,
}

impl FixedClock {
    pub fn new(now: UtcDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: UtcDateTime) {
        *self.now.lock().expect("clock lock poisoned") = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> UtcDateTime {
        *self.now.lock().expect("clock lock poisoned")
    }
}
