//! Periodic tick sources for the agent loop
//!
//! - [`IntervalScheduler`]: wall-clock ticks, `dt` measured between ticks
//! - [`LockstepScheduler`]: back-to-back ticks with a fixed `dt`, used with
//!   the simulated vehicle for faster-than-real-time runs and tests

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// One scheduler cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Zero-based tick counter
    pub index: u64,
    /// Seconds since the previous tick
    pub dt_s: f64,
}

#[async_trait]
pub trait Scheduler: Send {
    /// Wait for the next tick
    async fn next_tick(&mut self) -> Tick;

    /// Nominal tick period
    fn period(&self) -> Duration;
}

/// Wall-clock scheduler
///
/// Late ticks are delayed rather than bunched, so a slow cycle never causes
/// a burst of catch-up ticks.
#[derive(Debug)]
pub struct IntervalScheduler {
    interval: Interval,
    period: Duration,
    last: Option<Instant>,
    index: u64,
}

impl IntervalScheduler {
    /// Must be called from within a Tokio runtime.
    pub fn new(period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval,
            period,
            last: None,
            index: 0,
        }
    }
}

#[async_trait]
impl Scheduler for IntervalScheduler {
    async fn next_tick(&mut self) -> Tick {
        self.interval.tick().await;
        // A missed tick reports its scheduled instant, so measure from now
        let now = Instant::now();
        let dt_s = match self.last {
            Some(last) => now.duration_since(last).as_secs_f64(),
            None => self.period.as_secs_f64(),
        };
        self.last = Some(now);

        let tick = Tick {
            index: self.index,
            dt_s,
        };
        self.index += 1;
        tick
    }

    fn period(&self) -> Duration {
        self.period
    }
}

/// Fixed-step scheduler that never sleeps
///
/// Yields to the runtime before every tick so peer forwarders and other
/// agents on the same runtime keep making progress.
#[derive(Debug, Clone)]
pub struct LockstepScheduler {
    period: Duration,
    index: u64,
}

impl LockstepScheduler {
    pub fn new(period: Duration) -> Self {
        Self { period, index: 0 }
    }
}

#[async_trait]
impl Scheduler for LockstepScheduler {
    async fn next_tick(&mut self) -> Tick {
        tokio::task::yield_now().await;
        let tick = Tick {
            index: self.index,
            dt_s: self.period.as_secs_f64(),
        };
        self.index += 1;
        tick
    }

    fn period(&self) -> Duration {
        self.period
    }
}
