//! Screen backed by the terminal UI and optional external viewers.

use std::collections::HashMap;

use kioskdisplay::{DisplayError, MediaKind, Screen, Surface};
use tracing::debug;

use crate::viewer::{ExternalViewer, ViewerCommand};

/// Records the mounted surface for the UI to draw, and runs the configured
/// viewer for video and PDF surfaces while they are mounted.
#[derive(Default)]
pub struct TerminalScreen {
    players: HashMap<MediaKind, String>,
    current: Option<Surface>,
    viewer: Option<ExternalViewer>,
}

impl TerminalScreen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a viewer command template for `kind`.
    pub fn with_player(mut self, kind: MediaKind, template: impl Into<String>) -> Self {
        self.players.insert(kind, template.into());
        self
    }

    pub fn current(&self) -> Option<&Surface> {
        self.current.as_ref()
    }

    pub fn has_viewer(&self) -> bool {
        self.viewer.is_some()
    }

    fn player_for(&self, surface: &Surface) -> Option<&String> {
        let kind = match surface {
            Surface::Video(_) => MediaKind::Video,
            Surface::PdfViewer { .. } => MediaKind::Pdf,
            Surface::DocumentCard { .. } | Surface::Placeholder { .. } => return None,
        };
        self.players.get(&kind)
    }
}

impl Screen for TerminalScreen {
    fn mount(&mut self, surface: &Surface) -> kioskdisplay::Result<()> {
        if let (Some(template), Some(url)) = (self.player_for(surface), surface.source_ref()) {
            let viewer = ViewerCommand::from_template(template, url)
                .and_then(|command| ExternalViewer::spawn(&command))
                .map_err(|err| DisplayError::render(format!("{err:#}")))?;
            self.viewer = Some(viewer);
        }
        debug!(surface = surface.kind_name(), "Surface mounted");
        self.current = Some(surface.clone());
        Ok(())
    }

    fn unmount(&mut self) {
        if let Some(mut viewer) = self.viewer.take() {
            viewer.stop();
        }
        self.current = None;
    }
}
