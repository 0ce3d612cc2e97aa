// Frame clock bridge - ties session loops to the host's frame cadence
//
// Every suspension point in a session is "wait for the next host frame". The
// FrameClock trait is that wait. It returns the unscaled real time that passed
// since the previous frame, which is what timeouts accumulate.

use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Source of host frame ticks
#[allow(async_fn_in_trait)]
pub trait FrameClock {
    /// Suspend until the next frame, returning the unscaled delta since the previous one
    async fn tick(&mut self) -> Duration;
}

/// Duration of one frame at `frame_rate` frames per second, clamped to `[1ns, 1s]`
pub fn frame_period(frame_rate: u32) -> Duration {
    Duration::from_nanos((1_000_000_000 / u64::from(frame_rate.max(1))).max(1))
}

/// Frame clock driven by a tokio interval at a fixed frame rate
///
/// # Example
/// ```ignore
/// let mut clock = IntervalClock::new(60);
/// let delta = clock.tick().await;
/// ```
#[derive(Debug)]
pub struct IntervalClock {
    interval: Interval,
    last: Instant,
}

impl IntervalClock {
    /// Create a clock ticking `frame_rate` times per second (at least once)
    pub fn new(frame_rate: u32) -> Self {
        let period = frame_period(frame_rate);
        let mut interval = tokio::time::interval(period);
        // A stalled host should not replay a burst of missed frames
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval,
            last: Instant::now(),
        }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

impl FrameClock for IntervalClock {
    async fn tick(&mut self) -> Duration {
        let now = self.interval.tick().await;
        let delta = now.saturating_duration_since(self.last);
        self.last = now;
        delta
    }
}

/// Frame clock that yields to the scheduler once per tick and reports a fixed delta
///
/// Useful for headless hosts and deterministic tests: time advances by exactly
/// `step` per tick no matter how fast the loop actually runs.
#[derive(Debug, Clone)]
pub struct FixedStepClock {
    step: Duration,
    ticks: u64,
}

impl FixedStepClock {
    pub fn new(step: Duration) -> Self {
        Self { step, ticks: 0 }
    }

    /// Clock stepping at `frame_rate` frames per second
    pub fn from_frame_rate(frame_rate: u32) -> Self {
        Self::new(frame_period(frame_rate))
    }

    /// Ticks delivered so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Simulated time elapsed so far
    pub fn elapsed(&self) -> Duration {
        self.step * self.ticks as u32
    }
}

impl FrameClock for FixedStepClock {
    async fn tick(&mut self) -> Duration {
        tokio::task::yield_now().await;
        self.ticks += 1;
        self.step
    }
}
