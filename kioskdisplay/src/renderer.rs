//! Content rendering: maps a playlist item to a presentation surface and
//! mounts it on a [`Screen`].
//!
//! The renderer enforces the unmount discipline: whatever was mounted is
//! released before anything new is acquired, on every path (item change,
//! reload, deactivation and drop).

use tracing::{debug, warn};

use crate::errors::Result;
use crate::model::{MediaKind, PlaylistItem};

/// Why the screen shows a placeholder instead of content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmptyReason {
    /// The active playlist has no items.
    NoItems,
    /// The playlist could not be retrieved.
    SourceUnavailable,
    /// The item's media kind is not one the display knows how to show.
    UnsupportedMedia,
    /// The screen failed to mount the item's surface.
    RenderFailed,
}

impl EmptyReason {
    pub fn message(&self) -> &'static str {
        match self {
            EmptyReason::NoItems => "No files to display",
            EmptyReason::SourceUnavailable => "Playlist unavailable, waiting for the next reload",
            EmptyReason::UnsupportedMedia => "This file type cannot be displayed",
            EmptyReason::RenderFailed => "This file could not be displayed",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VideoSurface {
    pub title: String,
    pub source_ref: String,
    /// Always true: unattended autoplay requires muted media.
    pub muted: bool,
    pub autoplay: bool,
    pub controls: bool,
}

/// A presentation surface, one variant per media strategy.
#[derive(Clone, Debug, PartialEq)]
pub enum Surface {
    Video(VideoSurface),
    PdfViewer {
        title: String,
        source_ref: String,
    },
    /// Static preview card with an explicit "open" action; the document
    /// itself is never rendered inline.
    DocumentCard {
        title: String,
        source_ref: String,
        kind_label: String,
        open_label: String,
    },
    Placeholder {
        reason: EmptyReason,
        message: String,
    },
}

impl Surface {
    /// Selects the surface for an item. Unknown kinds fail closed to a
    /// placeholder.
    pub fn for_item(item: &PlaylistItem) -> Self {
        let title = item.display_name().to_string();
        let source_ref = item.source_ref().to_string();
        match item.media_kind() {
            MediaKind::Video => Surface::Video(VideoSurface {
                title,
                source_ref,
                muted: true,
                autoplay: true,
                controls: true,
            }),
            MediaKind::Pdf => Surface::PdfViewer { title, source_ref },
            MediaKind::Document => Surface::DocumentCard {
                title,
                source_ref,
                kind_label: "Spreadsheet / CSV document".to_string(),
                open_label: "Open document".to_string(),
            },
            MediaKind::Unknown(raw) => {
                warn!(item = %item.id(), kind = %raw, "Unsupported media kind, showing placeholder");
                Surface::placeholder(EmptyReason::UnsupportedMedia)
            }
        }
    }

    pub fn placeholder(reason: EmptyReason) -> Self {
        Surface::Placeholder {
            reason,
            message: reason.message().to_string(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Surface::Video(_) => "video",
            Surface::PdfViewer { .. } => "pdf-viewer",
            Surface::DocumentCard { .. } => "document-card",
            Surface::Placeholder { .. } => "placeholder",
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Surface::Placeholder { .. })
    }

    pub fn source_ref(&self) -> Option<&str> {
        match self {
            Surface::Video(video) => Some(&video.source_ref),
            Surface::PdfViewer { source_ref, .. } | Surface::DocumentCard { source_ref, .. } => {
                Some(source_ref)
            }
            Surface::Placeholder { .. } => None,
        }
    }
}

/// Output backend the renderer draws through.
///
/// `unmount` must release everything `mount` acquired (stop playing media,
/// close viewers) before returning.
pub trait Screen {
    fn mount(&mut self, surface: &Surface) -> Result<()>;
    fn unmount(&mut self);
}

/// Owns the screen and the currently mounted surface.
pub struct ContentRenderer<S: Screen> {
    screen: S,
    mounted: Option<Surface>,
}

impl<S: Screen> ContentRenderer<S> {
    pub fn new(screen: S) -> Self {
        Self {
            screen,
            mounted: None,
        }
    }

    pub fn show(&mut self, item: &PlaylistItem) {
        debug!(item = %item.id(), kind = %item.media_kind(), "Mounting item");
        self.replace(Surface::for_item(item));
    }

    pub fn show_placeholder(&mut self, reason: EmptyReason) {
        self.replace(Surface::placeholder(reason));
    }

    /// Releases the mounted surface, leaving the screen blank.
    pub fn clear(&mut self) {
        if let Some(previous) = self.mounted.take() {
            debug!(surface = previous.kind_name(), "Unmounting surface");
            self.screen.unmount();
        }
    }

    pub fn mounted(&self) -> Option<&Surface> {
        self.mounted.as_ref()
    }

    pub fn screen(&self) -> &S {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut S {
        &mut self.screen
    }

    fn replace(&mut self, surface: Surface) {
        self.clear();

        match self.screen.mount(&surface) {
            Ok(()) => self.mounted = Some(surface),
            Err(err) if !surface.is_placeholder() => {
                warn!(surface = surface.kind_name(), error = %err, "Mount failed, falling back to placeholder");
                let fallback = Surface::placeholder(EmptyReason::RenderFailed);
                match self.screen.mount(&fallback) {
                    Ok(()) => self.mounted = Some(fallback),
                    Err(err) => warn!(error = %err, "Placeholder mount failed, screen left blank"),
                }
            }
            Err(err) => warn!(error = %err, "Placeholder mount failed, screen left blank"),
        }
    }
}

impl<S: Screen> Drop for ContentRenderer<S> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// What a [`MemoryScreen`] saw, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum ScreenEvent {
    Mounted(Surface),
    Unmounted,
}

/// Headless screen recording mounts, used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryScreen {
    current: Option<Surface>,
    events: Vec<ScreenEvent>,
    /// Mounts attempted while another surface was still attached.
    overlaps: usize,
    /// Surface kinds this screen refuses to mount.
    refuse: Vec<&'static str>,
}

impl MemoryScreen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `mount` fail for the given surface kind (see [`Surface::kind_name`]).
    pub fn refusing(kind: &'static str) -> Self {
        Self {
            refuse: vec![kind],
            ..Self::default()
        }
    }

    pub fn current(&self) -> Option<&Surface> {
        self.current.as_ref()
    }

    pub fn events(&self) -> &[ScreenEvent] {
        &self.events
    }

    pub fn overlaps(&self) -> usize {
        self.overlaps
    }

    pub fn mount_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, ScreenEvent::Mounted(_)))
            .count()
    }
}

impl Screen for MemoryScreen {
    fn mount(&mut self, surface: &Surface) -> Result<()> {
        if self.refuse.contains(&surface.kind_name()) {
            return Err(crate::errors::DisplayError::render(format!(
                "{} surfaces are disabled",
                surface.kind_name()
            )));
        }
        if self.current.is_some() {
            self.overlaps += 1;
        }
        self.current = Some(surface.clone());
        self.events.push(ScreenEvent::Mounted(surface.clone()));
        Ok(())
    }

    fn unmount(&mut self) {
        self.current = None;
        self.events.push(ScreenEvent::Unmounted);
    }
}
