//! Playlist sources: where the engine gets its active playlist from.

use async_trait::async_trait;

use crate::errors::{DisplayError, Result};
use crate::model::PlaylistSnapshot;

/// Provider of the active, ordered playlist.
///
/// Implementations must return active items only, in display order.
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn fetch_active(&self) -> Result<PlaylistSnapshot>;
}

/// Source returning a fixed snapshot.
#[derive(Clone, Debug, Default)]
pub struct StaticPlaylistSource {
    snapshot: PlaylistSnapshot,
}

impl StaticPlaylistSource {
    pub fn new(snapshot: PlaylistSnapshot) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl PlaylistSource for StaticPlaylistSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_active(&self) -> Result<PlaylistSnapshot> {
        Ok(self.snapshot.clone())
    }
}

/// Source that always fails; stands in for an unreachable server.
#[derive(Clone, Debug)]
pub struct UnavailablePlaylistSource {
    reason: String,
}

impl UnavailablePlaylistSource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl PlaylistSource for UnavailablePlaylistSource {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn fetch_active(&self) -> Result<PlaylistSnapshot> {
        Err(DisplayError::source_failure(self.reason.clone()))
    }
}
