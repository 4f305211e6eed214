//! Rotation scheduler: the state machine deciding what is on screen and
//! when it changes.
//!
//! ## Timers
//!
//! The scheduler owns the only two timers of the engine:
//! - the advance timer, armed once per item for its remaining display time,
//! - the progress tick, re-armed every tick interval while playing.
//!
//! Timers are plain deadlines stamped with the scheduler generation. The
//! driving loop awaits the earliest deadline ([`RotationScheduler::next_deadline`])
//! and hands the fired [`TimerEvent`] back to [`RotationScheduler::on_timer`].
//! Every operation that changes what is shown or whether it is playing
//! cancels both timers and bumps the generation *before* touching state, so
//! an event fired for a superseded item is recognised and dropped.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::model::{PlaylistItem, PlaylistSnapshot};
use crate::progress::{DEFAULT_TICK_INTERVAL, ProgressSnapshot, ProgressTracker};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerKind {
    Advance,
    Tick,
}

/// A fired timer, as returned by the driving loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerEvent {
    pub kind: TimerKind,
    pub generation: u64,
}

#[derive(Clone, Copy, Debug)]
struct ArmedTimer {
    deadline: Instant,
    generation: u64,
}

/// What the renderer has to do after a scheduler operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Mount the item at this index.
    Show(usize),
    /// Same item, progress restarted; the surface stays mounted.
    Restarted,
    /// Nothing to show.
    ShowEmpty,
    /// Screen unchanged.
    None,
}

/// Playback state, exclusively owned by the scheduler.
#[derive(Clone, Debug, Default)]
pub struct RotationState {
    items: PlaylistSnapshot,
    current_index: Option<usize>,
    playing: bool,
}

impl RotationState {
    pub fn items(&self) -> &PlaylistSnapshot {
        &self.items
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_item(&self) -> Option<&PlaylistItem> {
        self.current_index.and_then(|i| self.items.get(i))
    }

    pub fn playing(&self) -> bool {
        self.playing
    }

    pub fn is_empty(&self) -> bool {
        self.current_index.is_none()
    }
}

pub struct RotationScheduler {
    state: RotationState,
    tracker: ProgressTracker,
    generation: u64,
    advance_timer: Option<ArmedTimer>,
    tick_timer: Option<ArmedTimer>,
    tick_interval: Duration,
}

impl Default for RotationScheduler {
    fn default() -> Self {
        Self::new(true, DEFAULT_TICK_INTERVAL)
    }
}

impl RotationScheduler {
    pub fn new(playing: bool, tick_interval: Duration) -> Self {
        Self {
            state: RotationState {
                playing,
                ..RotationState::default()
            },
            tracker: ProgressTracker::new(Duration::ZERO),
            generation: 0,
            advance_timer: None,
            tick_timer: None,
            tick_interval: tick_interval.max(Duration::from_millis(1)),
        }
    }

    pub fn state(&self) -> &RotationState {
        &self.state
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.tracker.snapshot()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_pending_timers(&self) -> bool {
        self.advance_timer.is_some() || self.tick_timer.is_some()
    }

    /// Replaces the playlist and restarts from its first item.
    pub fn load(&mut self, snapshot: PlaylistSnapshot, now: Instant) -> Transition {
        self.cancel_timers();
        self.state.items = snapshot;

        if self.state.items.is_empty() {
            self.state.current_index = None;
            self.tracker.reset(Duration::ZERO);
            debug!(generation = self.generation, "Loaded empty playlist");
            return Transition::ShowEmpty;
        }

        self.state.current_index = Some(0);
        self.restart_current(now);
        debug!(
            generation = self.generation,
            items = self.state.items.len(),
            "Loaded playlist"
        );
        Transition::Show(0)
    }

    /// Moves to the neighbouring item, wrapping in both directions.
    pub fn advance(&mut self, direction: Direction, now: Instant) -> Transition {
        let Some(current) = self.state.current_index else {
            return Transition::None;
        };
        self.cancel_timers();

        let len = self.state.items.len();
        let next = match direction {
            Direction::Next => (current + 1) % len,
            Direction::Previous => (current + len - 1) % len,
        };
        self.state.current_index = Some(next);
        self.restart_current(now);

        debug!(from = current, to = next, ?direction, "Advanced");
        if next == current {
            Transition::Restarted
        } else {
            Transition::Show(next)
        }
    }

    /// Flips play/pause and returns the new `playing` value.
    ///
    /// Resuming re-arms the advance timer for the remaining time of the
    /// current item, not its full duration.
    pub fn toggle_play_pause(&mut self, now: Instant) -> bool {
        self.cancel_timers();
        self.state.playing = !self.state.playing;

        if self.state.playing {
            if !self.state.is_empty() {
                self.arm(now);
            }
        } else {
            self.tracker.freeze();
        }
        debug!(playing = self.state.playing, "Play/pause toggled");
        self.state.playing
    }

    /// Cancels every timer. Items and position are kept.
    pub fn stop(&mut self) {
        self.cancel_timers();
        self.tracker.freeze();
        debug!("Rotation stopped");
    }

    /// Shows the current item again from elapsed zero; counterpart of
    /// [`stop`](Self::stop).
    pub fn start(&mut self, now: Instant) -> Transition {
        self.cancel_timers();
        match self.state.current_index {
            Some(index) => {
                self.restart_current(now);
                Transition::Show(index)
            }
            None => Transition::ShowEmpty,
        }
    }

    /// Earliest armed deadline. On a tie the advance wins, so a tick is never
    /// delivered for an item that is about to be replaced.
    pub fn next_deadline(&self) -> Option<(Instant, TimerEvent)> {
        let advance = self.advance_timer.map(|t| {
            (
                t.deadline,
                TimerEvent {
                    kind: TimerKind::Advance,
                    generation: t.generation,
                },
            )
        });
        let tick = self.tick_timer.map(|t| {
            (
                t.deadline,
                TimerEvent {
                    kind: TimerKind::Tick,
                    generation: t.generation,
                },
            )
        });

        match (advance, tick) {
            (Some(a), Some(t)) => Some(if t.0 < a.0 { t } else { a }),
            (a, t) => a.or(t),
        }
    }

    /// Applies a fired timer. Events from an older generation are dropped.
    pub fn on_timer(&mut self, event: TimerEvent, now: Instant) -> Transition {
        let slot = match event.kind {
            TimerKind::Advance => self.advance_timer,
            TimerKind::Tick => self.tick_timer,
        };
        let Some(armed) = slot.filter(|t| t.generation == event.generation) else {
            trace!(?event, current = self.generation, "Dropping stale timer event");
            return Transition::None;
        };

        match event.kind {
            TimerKind::Tick => {
                self.tracker.tick(now);
                self.tick_timer = if self.tracker.is_complete() {
                    None
                } else {
                    armed
                        .deadline
                        .checked_add(self.tick_interval)
                        .map(|deadline| ArmedTimer {
                            deadline,
                            generation: self.generation,
                        })
                };
                Transition::None
            }
            TimerKind::Advance => {
                self.advance_timer = None;
                self.advance(Direction::Next, now)
            }
        }
    }

    fn restart_current(&mut self, now: Instant) {
        let total = self
            .state
            .current_item()
            .map(|item| item.display_time())
            .unwrap_or_default();
        self.tracker.reset(total);
        if self.state.playing {
            self.arm(now);
        }
    }

    fn arm(&mut self, now: Instant) {
        self.tracker.resume(now);

        if !self.tracker.is_complete() {
            self.tick_timer = self.timer_after(now, self.tick_interval);
        }

        // a single item never auto-advances onto itself
        if self.state.items.len() > 1 {
            self.advance_timer = self.timer_after(now, self.tracker.remaining());
        }
    }

    /// `None` when the deadline is past what the clock can represent.
    fn timer_after(&self, now: Instant, delay: Duration) -> Option<ArmedTimer> {
        match now.checked_add(delay) {
            Some(deadline) => Some(ArmedTimer {
                deadline,
                generation: self.generation,
            }),
            None => {
                warn!(delay_secs = delay.as_secs(), "Timer deadline out of range, not armed");
                None
            }
        }
    }

    fn cancel_timers(&mut self) {
        self.advance_timer = None;
        self.tick_timer = None;
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MediaKind;

    fn snapshot(durations: &[f64]) -> PlaylistSnapshot {
        durations
            .iter()
            .enumerate()
            .map(|(i, d)| {
                PlaylistItem::new(i.to_string(), format!("item-{i}"), MediaKind::Pdf, "u", *d)
                    .unwrap()
            })
            .collect()
    }

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_load_empty_arms_nothing() {
        let mut scheduler = RotationScheduler::default();
        let t0 = Instant::now();
        assert_eq!(scheduler.load(PlaylistSnapshot::empty(), t0), Transition::ShowEmpty);
        assert!(scheduler.state().is_empty());
        assert!(!scheduler.has_pending_timers());
        assert!(scheduler.next_deadline().is_none());
    }

    #[test]
    fn test_load_arms_advance_for_display_time() {
        let mut scheduler = RotationScheduler::default();
        let t0 = Instant::now();
        assert_eq!(scheduler.load(snapshot(&[10.0, 5.0]), t0), Transition::Show(0));
        let (deadline, event) = scheduler.next_deadline().unwrap();
        assert_eq!(event.kind, TimerKind::Tick);
        assert_eq!(deadline, t0 + DEFAULT_TICK_INTERVAL);
        assert_eq!(scheduler.advance_timer.unwrap().deadline, t0 + secs(10.0));
    }

    #[test]
    fn test_longest_display_time_arms_without_overflow() {
        let mut scheduler = RotationScheduler::default();
        let t0 = Instant::now();
        let longest = Duration::from_secs(u32::MAX as u64);
        assert_eq!(
            scheduler.load(snapshot(&[crate::model::MAX_DISPLAY_SECONDS, 5.0]), t0),
            Transition::Show(0)
        );
        if let Some(advance) = scheduler.advance_timer {
            assert_eq!(advance.deadline, t0 + longest);
        }
        assert_eq!(scheduler.next_deadline().unwrap().1.kind, TimerKind::Tick);
        assert_eq!(scheduler.advance(Direction::Next, t0), Transition::Show(1));
        assert_eq!(scheduler.advance_timer.unwrap().deadline, t0 + secs(5.0));
    }

    #[test]
    fn test_load_while_paused_arms_nothing() {
        let mut scheduler = RotationScheduler::new(false, DEFAULT_TICK_INTERVAL);
        assert_eq!(
            scheduler.load(snapshot(&[10.0, 5.0]), Instant::now()),
            Transition::Show(0)
        );
        assert!(!scheduler.has_pending_timers());
    }

    #[test]
    fn test_next_wraps_around() {
        let mut scheduler = RotationScheduler::default();
        let t0 = Instant::now();
        scheduler.load(snapshot(&[1.0, 1.0, 1.0]), t0);
        for expected in [1, 2, 0] {
            assert_eq!(scheduler.advance(Direction::Next, t0), Transition::Show(expected));
        }
    }

    #[test]
    fn test_previous_wraps_around() {
        let mut scheduler = RotationScheduler::default();
        let t0 = Instant::now();
        scheduler.load(snapshot(&[1.0, 1.0, 1.0]), t0);
        assert_eq!(scheduler.advance(Direction::Previous, t0), Transition::Show(2));
        assert_eq!(scheduler.advance(Direction::Previous, t0), Transition::Show(1));
    }

    #[test]
    fn test_single_item_never_arms_advance() {
        let mut scheduler = RotationScheduler::default();
        let t0 = Instant::now();
        scheduler.load(snapshot(&[3.0]), t0);
        assert!(scheduler.advance_timer.is_none());
        assert!(scheduler.tick_timer.is_some());

        assert_eq!(scheduler.advance(Direction::Next, t0), Transition::Restarted);
        assert!(scheduler.advance_timer.is_none());
        assert_eq!(scheduler.progress().elapsed_seconds, 0.0);
    }

    #[test]
    fn test_advance_on_empty_is_noop() {
        let mut scheduler = RotationScheduler::default();
        let t0 = Instant::now();
        scheduler.load(PlaylistSnapshot::empty(), t0);
        let generation = scheduler.generation();
        assert_eq!(scheduler.advance(Direction::Next, t0), Transition::None);
        assert_eq!(scheduler.generation(), generation);
    }

    #[test]
    fn test_stale_event_is_dropped_after_reload() {
        let mut scheduler = RotationScheduler::default();
        let t0 = Instant::now();
        scheduler.load(snapshot(&[2.0, 2.0]), t0);
        let stale = TimerEvent {
            kind: TimerKind::Advance,
            generation: scheduler.generation(),
        };

        scheduler.load(snapshot(&[4.0, 4.0, 4.0]), t0 + secs(1.0));
        assert_eq!(scheduler.on_timer(stale, t0 + secs(2.0)), Transition::None);
        assert_eq!(scheduler.state().current_index(), Some(0));
        assert_eq!(scheduler.state().items().len(), 3);
    }

    #[test]
    fn test_pause_cancels_and_resume_rearms_remaining() {
        let mut scheduler = RotationScheduler::default();
        let t0 = Instant::now();
        scheduler.load(snapshot(&[10.0, 5.0]), t0);

        // drive ticks up to t = 3s
        while let Some((deadline, event)) = scheduler.next_deadline() {
            if deadline > t0 + secs(3.0) {
                break;
            }
            scheduler.on_timer(event, deadline);
        }
        assert!(!scheduler.toggle_play_pause(t0 + secs(3.05)));
        assert!(!scheduler.has_pending_timers());
        assert_eq!(scheduler.progress().remaining_whole_seconds(), 7);

        let resume_at = t0 + secs(30.0);
        assert!(scheduler.toggle_play_pause(resume_at));
        assert_eq!(
            scheduler.advance_timer.unwrap().deadline,
            resume_at + secs(7.0)
        );
    }

    #[test]
    fn test_stop_then_start_restarts_current_item() {
        let mut scheduler = RotationScheduler::default();
        let t0 = Instant::now();
        scheduler.load(snapshot(&[10.0, 5.0, 5.0]), t0);
        scheduler.advance(Direction::Next, t0);
        scheduler.stop();
        assert!(!scheduler.has_pending_timers());
        assert_eq!(scheduler.state().current_index(), Some(1));

        assert_eq!(scheduler.start(t0 + secs(60.0)), Transition::Show(1));
        assert_eq!(scheduler.progress().elapsed_seconds, 0.0);
        assert!(scheduler.has_pending_timers());
    }
}
