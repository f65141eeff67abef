//! Fixed-period tick source for the worker loops.
//!
//! Each wait sleeps until an absolute deadline and then advances the
//! deadline by exactly one period, so time spent doing the tick's work does
//! not accumulate as drift.  A worker that overruns a whole period does not
//! get a burst of catch-up ticks: the deadline is re-anchored to now.

use std::time::{Duration, Instant};

pub struct PeriodicTicker {
    period: Duration,
    next_deadline: Instant,
}

impl PeriodicTicker {
    /// First tick fires one `period` from now.
    pub fn new(period: Duration) -> Self {
        Self::starting_at(Instant::now(), period)
    }

    /// First tick fires one `period` after `anchor`.
    pub fn starting_at(anchor: Instant, period: Duration) -> Self {
        Self {
            period,
            next_deadline: anchor + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn next_deadline(&self) -> Instant {
        self.next_deadline
    }

    /// Block until the next deadline.
    pub fn wait(&mut self) {
        let now = Instant::now();
        if let Some(remaining) = self.next_deadline.checked_duration_since(now) {
            std::thread::sleep(remaining);
        }
        self.advance(Instant::now());
    }

    fn advance(&mut self, now: Instant) {
        self.next_deadline += self.period;
        if self.next_deadline + self.period <= now {
            log::debug!("ticker: overran by more than one period, re-anchoring");
            self.next_deadline = now + self.period;
        }
    }
}
