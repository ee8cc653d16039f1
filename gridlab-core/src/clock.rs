//! Synthetic clock: strictly increasing instants within a price-bar epoch.
//!
//! Several state transitions can happen logically "at" one bar (an order
//! opens, fills, and closes) yet each needs a distinct ordered timestamp
//! for ids and equity-series keys. The intra-bar tick counter manufactures
//! that ordering deterministically with no wall-clock reads, which is what
//! keeps backtests reproducible.

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone)]
pub struct Clock {
    start_epoch: DateTime<Utc>,
    epoch: DateTime<Utc>,
    tock: Duration,
    tick: i32,
    last: DateTime<Utc>,
}

impl Clock {
    /// A clock ticking in `tock` steps, positioned at the unix epoch until
    /// `start` is called.
    ///
    /// `tock` must stay small relative to the bar interval so intra-bar
    /// ticks never spill past the next epoch.
    pub fn new(tock: Duration) -> Self {
        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        Self {
            start_epoch: epoch,
            epoch,
            tock,
            tick: 0,
            last: epoch,
        }
    }

    /// Reset the clock to a new starting epoch.
    pub fn start(&mut self, epoch: DateTime<Utc>) {
        self.start_epoch = epoch;
        self.epoch = epoch;
        self.tick = 0;
        self.last = epoch;
    }

    /// Move to a new bar boundary and reset the intra-bar tick counter.
    pub fn advance(&mut self, epoch: DateTime<Utc>) {
        self.epoch = epoch;
        self.tick = 0;
    }

    /// The next instant within the current bar.
    ///
    /// Repeated calls within one bar yield strictly increasing instants,
    /// never equal.
    pub fn now(&mut self) -> DateTime<Utc> {
        let at = self.epoch + self.tock * self.tick;
        self.tick += 1;
        self.last = at;
        at
    }

    /// The last instant produced by `now`, without advancing.
    pub fn peek(&self) -> DateTime<Utc> {
        self.last
    }

    /// Duration from the start epoch to the current epoch.
    pub fn elapsed(&self) -> Duration {
        self.epoch - self.start_epoch
    }

    /// The current bar boundary.
    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }
}
