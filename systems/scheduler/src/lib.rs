#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic tick source that decides when the next generation is due.
//!
//! The scheduler never reads a clock. Its owner feeds elapsed time through
//! [`Scheduler::advance`] and asks [`Scheduler::remaining`] how long it may
//! sleep, which keeps every tick decision reproducible under test.

use std::time::Duration;

use tracing::debug;

/// Periodic tick source driving generation steps while active.
#[derive(Clone, Debug)]
pub struct Scheduler {
    interval: Duration,
    accumulator: Duration,
    active: bool,
}

impl Scheduler {
    /// Creates an idle scheduler using the provided interval.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            accumulator: Duration::ZERO,
            active: false,
        }
    }

    /// Begins ticking with a fresh interval.
    pub fn start(&mut self) {
        self.accumulator = Duration::ZERO;
        self.active = true;
    }

    /// Cancels ticking. Time fed afterwards never produces a tick.
    pub fn stop(&mut self) {
        self.accumulator = Duration::ZERO;
        self.active = false;
    }

    /// Replaces the interval, discarding time accumulated toward the old one.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
        self.accumulator = Duration::ZERO;
    }

    /// Reports whether the scheduler is ticking.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Interval between ticks.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Time left until the next tick, or `None` while idle.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        if !self.active {
            return None;
        }
        Some(self.interval.saturating_sub(self.accumulator))
    }

    /// Feeds elapsed time and reports whether a tick is due.
    ///
    /// At most one tick is reported per call so that exactly one step is in
    /// flight at a time. Whole intervals missed during a long stall are
    /// dropped rather than replayed as a burst.
    pub fn advance(&mut self, dt: Duration) -> bool {
        if !self.active || self.interval.is_zero() {
            return false;
        }

        self.accumulator = self.accumulator.saturating_add(dt);
        let mut due = 0_u64;
        while self.accumulator >= self.interval {
            self.accumulator -= self.interval;
            due += 1;
        }

        if due > 1 {
            debug!(skipped = due - 1, interval = ?self.interval, "dropping missed ticks");
        }
        due > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_never_ticks() {
        let mut scheduler = Scheduler::new(Duration::ZERO);
        scheduler.start();
        assert!(!scheduler.advance(Duration::from_secs(10)));
    }
}
