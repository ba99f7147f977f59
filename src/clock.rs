// Clock abstraction so polling and timeouts can be tested without real sleeps
use std::time::{Duration, Instant};

/// Source of time for retry loops and process timeouts
pub trait Clock: Send + Sync {
    /// Get the current instant
    fn now(&self) -> Instant;

    /// Block for the given duration
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `std::thread::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
