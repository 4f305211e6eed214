//! Progress tracking for the item currently on screen.
//!
//! The tracker does not own a timer. The rotation scheduler calls
//! [`ProgressTracker::tick`] at a fixed cadence while playing, and the
//! tracker samples the clock at those points only: between ticks, and while
//! frozen, the reported values do not move.

use std::time::Duration;

use tokio::time::Instant;

/// Default tick granularity of the progress indicator.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Values published to the UI after each tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressSnapshot {
    pub elapsed_seconds: f64,
    pub remaining_seconds: f64,
    pub completion_ratio: f64,
}

impl ProgressSnapshot {
    /// Remaining time rounded up to whole seconds, as shown on the countdown.
    pub fn remaining_whole_seconds(&self) -> u64 {
        self.remaining_seconds.ceil() as u64
    }
}

#[derive(Clone, Debug)]
pub struct ProgressTracker {
    total: Duration,
    /// Elapsed time banked before the current running stretch.
    banked: Duration,
    running_since: Option<Instant>,
    /// Value observed at the last tick.
    elapsed: Duration,
}

impl ProgressTracker {
    /// Creates a stopped tracker at zero for an item of `total` duration.
    pub fn new(total: Duration) -> Self {
        Self {
            total,
            banked: Duration::ZERO,
            running_since: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Starts over for a new item. The tracker is left stopped.
    pub fn reset(&mut self, total: Duration) {
        *self = Self::new(total);
    }

    /// Starts counting from the last ticked value.
    pub fn resume(&mut self, now: Instant) {
        if self.running_since.is_none() {
            self.banked = self.elapsed;
            self.running_since = Some(now);
        }
    }

    /// Stops counting; the value stays at the last tick.
    pub fn freeze(&mut self) {
        self.running_since = None;
        self.banked = self.elapsed;
    }

    /// Samples the clock. Does nothing while frozen.
    pub fn tick(&mut self, now: Instant) -> ProgressSnapshot {
        if let Some(since) = self.running_since {
            let sampled = self.banked + now.saturating_duration_since(since);
            // never step backwards, even if the caller hands us an older instant
            self.elapsed = self.elapsed.max(sampled);
        }
        self.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed >= self.total
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn remaining(&self) -> Duration {
        self.total.saturating_sub(self.elapsed)
    }

    pub fn completion_ratio(&self) -> f64 {
        if self.total.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.total.as_secs_f64()).min(1.0)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            elapsed_seconds: self.elapsed.as_secs_f64(),
            remaining_seconds: self.remaining().as_secs_f64(),
            completion_ratio: self.completion_ratio(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_new_tracker_is_stopped_at_zero() {
        let tracker = ProgressTracker::new(secs(10.0));
        let snap = tracker.snapshot();
        assert!(!tracker.is_running());
        assert_eq!(snap.elapsed_seconds, 0.0);
        assert_eq!(snap.remaining_whole_seconds(), 10);
        assert_eq!(snap.completion_ratio, 0.0);
    }

    #[test]
    fn test_tick_samples_elapsed_time() {
        let start = Instant::now();
        let mut tracker = ProgressTracker::new(secs(10.0));
        tracker.resume(start);

        let snap = tracker.tick(start + secs(5.0));
        assert!((snap.completion_ratio - 0.5).abs() < 1e-9);
        assert_eq!(snap.remaining_whole_seconds(), 5);

        let snap = tracker.tick(start + secs(12.0));
        assert_eq!(snap.completion_ratio, 1.0);
        assert_eq!(snap.remaining_seconds, 0.0);
        assert!(tracker.is_complete());
    }

    #[test]
    fn test_freeze_holds_last_tick_value() {
        let start = Instant::now();
        let mut tracker = ProgressTracker::new(secs(10.0));
        tracker.resume(start);
        tracker.tick(start + secs(3.0));
        tracker.freeze();

        let frozen = tracker.tick(start + secs(9.0));
        assert_eq!(frozen.remaining_whole_seconds(), 7);
        assert!(!tracker.is_running());

        // resuming counts on from the frozen value, not from wall time
        tracker.resume(start + secs(20.0));
        let snap = tracker.tick(start + secs(21.0));
        assert!((snap.elapsed_seconds - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_remaining_rounds_up() {
        let start = Instant::now();
        let mut tracker = ProgressTracker::new(secs(10.0));
        tracker.resume(start);
        let snap = tracker.tick(start + secs(0.1));
        assert_eq!(snap.remaining_whole_seconds(), 10);
        let snap = tracker.tick(start + secs(9.9));
        assert_eq!(snap.remaining_whole_seconds(), 1);
    }

    #[test]
    fn test_reset_starts_over() {
        let start = Instant::now();
        let mut tracker = ProgressTracker::new(secs(10.0));
        tracker.resume(start);
        tracker.tick(start + secs(4.0));
        tracker.reset(secs(5.0));
        assert!(!tracker.is_running());
        assert_eq!(tracker.elapsed(), Duration::ZERO);
        assert_eq!(tracker.remaining(), secs(5.0));
    }
}
