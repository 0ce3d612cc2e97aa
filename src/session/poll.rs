//! Frame-bound poll loop.
//!
//! Each iteration evaluates a caller-supplied step, then suspends until the
//! next host frame. Elapsed time is the sum of the unscaled frame deltas, so
//! timeouts are unaffected by simulation speed.

use crate::ui::bridge::FrameClock;
use std::time::Duration;

/// Accumulated-time deadline. A limit of zero or less disables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    limit: Option<Duration>,
    elapsed: Duration,
}

impl Deadline {
    /// Deadline after `seconds` of accumulated time; `<= 0` (or non-finite) never expires.
    /// Limits beyond `Duration::MAX` saturate.
    pub fn from_seconds(seconds: f32) -> Self {
        let limit = (seconds.is_finite() && seconds > 0.0)
            .then(|| Duration::try_from_secs_f32(seconds).unwrap_or(Duration::MAX));
        Self {
            limit,
            elapsed: Duration::ZERO,
        }
    }

    pub fn disabled() -> Self {
        Self {
            limit: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn advance(&mut self, delta: Duration) {
        self.elapsed = self.elapsed.saturating_add(delta);
    }

    pub fn is_expired(&self) -> bool {
        self.limit.is_some_and(|limit| self.elapsed >= limit)
    }
}

/// Result of one loop iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep<T> {
    /// Nothing yet, wait for the next frame
    Pending,
    Ready(T),
    Cancel,
}

/// How the loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    Cancelled,
    TimedOut,
}

/// Run `step` once per host frame until it resolves, cancels, or `deadline` expires.
///
/// The step always runs before the first suspension, and the deadline is
/// checked right after each frame so a step never runs past expiry.
pub async fn poll_until<C, T, F>(clock: &mut C, deadline: &mut Deadline, mut step: F) -> PollOutcome<T>
where
    C: FrameClock,
    F: FnMut() -> PollStep<T>,
{
    loop {
        match step() {
            PollStep::Ready(value) => return PollOutcome::Ready(value),
            PollStep::Cancel => return PollOutcome::Cancelled,
            PollStep::Pending => {}
        }

        let delta = clock.tick().await;
        deadline.advance(delta);
        if deadline.is_expired() {
            tracing::debug!("Poll loop timed out after {:?}", deadline.elapsed());
            return PollOutcome::TimedOut;
        }
    }
}
