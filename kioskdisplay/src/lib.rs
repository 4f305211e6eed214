//! # kioskdisplay
//!
//! Display rotation engine for unattended signage screens.
//!
//! The engine takes an ordered snapshot of active playlist items and shows
//! them one at a time, each for its own display time, looping forever. It
//! exposes play/pause, next/previous and a countdown with a progress ratio,
//! and degrades to a placeholder when the playlist is empty or the server
//! cannot be reached.
//!
//! ## Layout
//!
//! - [`model`]: playlist items and snapshots
//! - [`progress`]: per-item elapsed/remaining accounting
//! - [`scheduler`]: rotation state and deadline-based timers
//! - [`renderer`]: surfaces, the [`Screen`] seam and the content renderer
//! - [`engine`]: the [`DisplayEngine`] facade driven by the UI
//! - [`source`] and [`rest_source`]: where playlists come from
//!
//! ## Timers
//!
//! Timers are plain deadlines owned by the scheduler and tagged with a
//! generation. Any reload, navigation, pause or stop bumps the generation,
//! so an event from a cancelled timer is dropped by
//! [`DisplayEngine::on_timer`] instead of acting on the new state.

pub mod engine;
pub mod errors;
pub mod model;
pub mod progress;
pub mod renderer;
pub mod rest_source;
pub mod scheduler;
pub mod source;

#[cfg(feature = "kioskconfig")]
pub mod config_ext;

pub use engine::{DisplayEngine, DisplayStatus, EngineOptions};
pub use errors::{DisplayError, Result};
pub use model::{
    ItemId, MAX_DISPLAY_SECONDS, MediaKind, PlaylistItem, PlaylistSnapshot, display_duration,
};
pub use progress::{DEFAULT_TICK_INTERVAL, ProgressSnapshot, ProgressTracker};
pub use renderer::{
    ContentRenderer, EmptyReason, MemoryScreen, Screen, ScreenEvent, Surface, VideoSurface,
};
pub use rest_source::{FileRecord, RestPlaylistSource, RestSourceBuilder, snapshot_from_records};
pub use scheduler::{
    Direction, RotationScheduler, RotationState, TimerEvent, TimerKind, Transition,
};
pub use source::{PlaylistSource, StaticPlaylistSource, UnavailablePlaylistSource};

#[cfg(feature = "kioskconfig")]
pub use config_ext::DisplayConfigExt;
