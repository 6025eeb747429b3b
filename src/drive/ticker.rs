use std::time::{Duration, Instant};

/// Host per-frame callback source.
///
/// Each call blocks until the next frame is due and returns the host clock in milliseconds.
pub trait FrameTicker {
    fn next_frame(&mut self) -> f64;
}

/// Real-time ticker pacing callbacks at a fixed rate against `Instant`.
#[derive(Debug)]
pub struct WallTicker {
    origin: Instant,
    interval: Duration,
    next_due: Option<Instant>,
}

impl WallTicker {
    /// Tick `rate_hz` times per second (at least once).
    pub fn new(rate_hz: u32) -> Self {
        Self {
            origin: Instant::now(),
            interval: Duration::from_secs_f64(1.0 / f64::from(rate_hz.max(1))),
            next_due: None,
        }
    }
}

impl FrameTicker for WallTicker {
    fn next_frame(&mut self) -> f64 {
        let now = Instant::now();
        if let Some(due) = self.next_due
            && due > now
        {
            std::thread::sleep(due - now);
        }
        let fired = Instant::now();
        // A late callback reschedules from now rather than bursting to catch up.
        let next = self
            .next_due
            .map_or(fired + self.interval, |d| d + self.interval);
        self.next_due = Some(if next < fired { fired + self.interval } else { next });
        fired.duration_since(self.origin).as_secs_f64() * 1000.0
    }
}

/// Virtual clock that advances exactly one interval per callback, never sleeping.
///
/// Drives frame-accurate offline export.
#[derive(Clone, Debug)]
pub struct SteppedTicker {
    start_ms: f64,
    step_ms: f64,
    ticks: u64,
}

impl SteppedTicker {
    /// Step at `rate_hz` from time zero.
    pub fn new(rate_hz: u32) -> Self {
        Self::starting_at(0.0, rate_hz)
    }

    /// Step at `rate_hz` from `start_ms`.
    pub fn starting_at(start_ms: f64, rate_hz: u32) -> Self {
        Self {
            start_ms,
            step_ms: 1000.0 / f64::from(rate_hz.max(1)),
            ticks: 0,
        }
    }

    pub fn step_ms(&self) -> f64 {
        self.step_ms
    }
}

impl FrameTicker for SteppedTicker {
    fn next_frame(&mut self) -> f64 {
        let now = self.start_ms + self.ticks as f64 * self.step_ms;
        self.ticks += 1;
        now
    }
}
