//! Display engine facade.
//!
//! Composes the rotation scheduler, the content renderer and the progress
//! tracker behind the handful of calls the surrounding UI needs. The UI
//! owns one engine per session and drives it from a single task:
//!
//! ```no_run
//! use kioskdisplay::{DisplayEngine, EngineOptions, MemoryScreen, PlaylistSnapshot};
//!
//! # async fn run(snapshot: PlaylistSnapshot) {
//! let mut engine = DisplayEngine::new(MemoryScreen::new(), EngineOptions::default());
//! engine.activate(snapshot);
//! loop {
//!     let event = engine.next_timer().await;
//!     engine.on_timer(event);
//!     let status = engine.status();
//!     println!("{:?} {}s", status.display_name, status.remaining_seconds);
//! }
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::model::{MediaKind, PlaylistSnapshot};
use crate::progress::DEFAULT_TICK_INTERVAL;
use crate::renderer::{ContentRenderer, EmptyReason, Screen};
use crate::scheduler::{Direction, RotationScheduler, RotationState, TimerEvent, Transition};
use crate::source::PlaylistSource;

#[derive(Clone, Debug)]
pub struct EngineOptions {
    /// Whether rotation runs right after the first activation.
    pub start_playing: bool,
    pub tick_interval: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            start_playing: true,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

/// Read-only view used to draw the item name, countdown and progress bar.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayStatus {
    pub display_name: Option<String>,
    pub media_kind: Option<MediaKind>,
    pub remaining_seconds: u64,
    pub elapsed_seconds: f64,
    pub completion_ratio: f64,
    pub is_empty: bool,
    pub playing: bool,
    pub active: bool,
    /// 1-based position and playlist length.
    pub position: Option<(usize, usize)>,
    pub empty_reason: Option<EmptyReason>,
}

pub struct DisplayEngine<S: Screen> {
    scheduler: RotationScheduler,
    renderer: ContentRenderer<S>,
    active: bool,
    empty_reason: EmptyReason,
}

impl<S: Screen> DisplayEngine<S> {
    pub fn new(screen: S, options: EngineOptions) -> Self {
        Self {
            scheduler: RotationScheduler::new(options.start_playing, options.tick_interval),
            renderer: ContentRenderer::new(screen),
            active: false,
            empty_reason: EmptyReason::NoItems,
        }
    }

    /// Starts a session on `snapshot`. Calling it again while active is a reload.
    pub fn activate(&mut self, snapshot: PlaylistSnapshot) {
        info!(items = snapshot.len(), "Activating display");
        self.active = true;
        self.load_with_reason(snapshot, EmptyReason::NoItems);
    }

    /// Replaces the playlist. Pending timers are cancelled before the new
    /// snapshot is installed.
    pub fn load(&mut self, snapshot: PlaylistSnapshot) {
        self.load_with_reason(snapshot, EmptyReason::NoItems);
    }

    /// Fetches the active playlist and loads it.
    ///
    /// A failing source degrades to the empty-state placeholder; the error is
    /// returned for logging only and the engine stays usable.
    pub async fn reload_from<P>(&mut self, source: &P) -> Result<()>
    where
        P: PlaylistSource + ?Sized,
    {
        match source.fetch_active().await {
            Ok(snapshot) => {
                self.active = true;
                self.load(snapshot);
                Ok(())
            }
            Err(err) => {
                warn!(source = source.name(), error = %err, "Playlist source failed, showing empty state");
                self.active = true;
                self.load_with_reason(PlaylistSnapshot::empty(), EmptyReason::SourceUnavailable);
                Err(err)
            }
        }
    }

    /// Fetches the playlist and reloads only if it differs from the one
    /// rotating. Returns whether a reload happened. Errors leave the current
    /// rotation untouched.
    pub async fn refresh_from<P>(&mut self, source: &P) -> Result<bool>
    where
        P: PlaylistSource + ?Sized,
    {
        let snapshot = source.fetch_active().await?;
        if &snapshot == self.scheduler.state().items()
            && self.empty_reason != EmptyReason::SourceUnavailable
        {
            debug!(source = source.name(), "Playlist unchanged");
            return Ok(false);
        }
        info!(source = source.name(), items = snapshot.len(), "Playlist changed, reloading");
        self.load(snapshot);
        Ok(true)
    }

    /// Ends the session: timers cancelled, surface released. Items are kept
    /// so that [`resume`](Self::resume) can pick up where the session stopped.
    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }
        info!("Deactivating display");
        self.scheduler.stop();
        self.renderer.clear();
        self.active = false;
    }

    /// Reactivates without reloading: the item shown at deactivation comes
    /// back from elapsed zero.
    pub fn resume(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        let transition = self.scheduler.start(Instant::now());
        self.apply(transition);
    }

    pub fn next(&mut self) {
        self.navigate(Direction::Next);
    }

    pub fn previous(&mut self) {
        self.navigate(Direction::Previous);
    }

    /// Returns the new `playing` value.
    pub fn toggle_play_pause(&mut self) -> bool {
        if !self.active {
            debug!("Ignoring play/pause on inactive display");
            return self.scheduler.state().playing();
        }
        self.scheduler.toggle_play_pause(Instant::now())
    }

    /// Waits for the earliest armed timer.
    ///
    /// The returned future does not borrow the engine; it never resolves when
    /// nothing is armed. Pass the event to [`on_timer`](Self::on_timer).
    pub fn next_timer(&self) -> impl Future<Output = TimerEvent> + Send + use<S> {
        let armed = self.scheduler.next_deadline();
        async move {
            match armed {
                Some((deadline, event)) => {
                    tokio::time::sleep_until(deadline).await;
                    event
                }
                None => std::future::pending().await,
            }
        }
    }

    pub fn on_timer(&mut self, event: TimerEvent) {
        let transition = self.scheduler.on_timer(event, Instant::now());
        self.apply(transition);
    }

    pub fn status(&self) -> DisplayStatus {
        let state = self.scheduler.state();
        let current = state.current_item();
        let progress = self.scheduler.progress();

        match current {
            Some(item) => DisplayStatus {
                display_name: Some(item.display_name().to_string()),
                media_kind: Some(item.media_kind().clone()),
                remaining_seconds: progress.remaining_whole_seconds(),
                elapsed_seconds: progress.elapsed_seconds,
                completion_ratio: progress.completion_ratio,
                is_empty: false,
                playing: state.playing(),
                active: self.active,
                position: state.current_index().map(|i| (i + 1, state.items().len())),
                empty_reason: None,
            },
            None => DisplayStatus {
                display_name: None,
                media_kind: None,
                remaining_seconds: 0,
                elapsed_seconds: 0.0,
                completion_ratio: 0.0,
                is_empty: true,
                playing: state.playing(),
                active: self.active,
                position: None,
                empty_reason: Some(self.empty_reason),
            },
        }
    }

    pub fn state(&self) -> &RotationState {
        self.scheduler.state()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn has_pending_timers(&self) -> bool {
        self.scheduler.has_pending_timers()
    }

    pub fn renderer(&self) -> &ContentRenderer<S> {
        &self.renderer
    }

    pub fn screen(&self) -> &S {
        self.renderer.screen()
    }

    fn navigate(&mut self, direction: Direction) {
        if !self.active {
            debug!(?direction, "Ignoring navigation on inactive display");
            return;
        }
        let transition = self.scheduler.advance(direction, Instant::now());
        self.apply(transition);
    }

    fn load_with_reason(&mut self, snapshot: PlaylistSnapshot, reason: EmptyReason) {
        self.empty_reason = reason;
        let transition = self.scheduler.load(snapshot, Instant::now());
        if self.active {
            self.apply(transition);
        } else {
            // kept for the next resume(), nothing runs while inactive
            self.scheduler.stop();
        }
    }

    fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Show(index) => {
                if let Some(item) = self.scheduler.state().items().get(index) {
                    self.renderer.show(item);
                }
            }
            Transition::ShowEmpty => self.renderer.show_placeholder(self.empty_reason),
            Transition::Restarted | Transition::None => {}
        }
    }
}

impl<S: Screen> Drop for DisplayEngine<S> {
    fn drop(&mut self) {
        self.deactivate();
    }
}
