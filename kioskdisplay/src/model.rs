//! Playlist data model: items, media kinds and ordered snapshots.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{DisplayError, Result};

/// Opaque identifier of a playlist item, stable across reloads.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub String);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Media kind of a playlist item; selects the rendering strategy.
///
/// Values the engine does not know are kept verbatim in `Unknown` so that
/// the renderer can fall back to a placeholder instead of rejecting the
/// whole playlist.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MediaKind {
    Video,
    Pdf,
    Document,
    Unknown(String),
}

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi"];
const DOCUMENT_EXTENSIONS: &[&str] = &["xlsx", "xls", "csv", "ods"];
const PDF_EXTENSIONS: &[&str] = &["pdf"];

impl MediaKind {
    /// Parses the wire name (`video`, `pdf`, `document`), case-insensitively.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "video" => MediaKind::Video,
            "pdf" => MediaKind::Pdf,
            "document" => MediaKind::Document,
            _ => MediaKind::Unknown(raw.to_string()),
        }
    }

    /// Guesses the kind from a file name extension.
    ///
    /// Returns `None` when the name has no extension or the extension is not
    /// one the display accepts.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Document)
        } else if PDF_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Pdf)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Pdf => "pdf",
            MediaKind::Document => "document",
            MediaKind::Unknown(raw) => raw,
        }
    }

    /// Human readable label shown next to the item.
    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Video => "Video",
            MediaKind::Pdf => "PDF",
            MediaKind::Document => "Spreadsheet",
            MediaKind::Unknown(_) => "File",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, MediaKind::Unknown(_))
    }
}

impl From<String> for MediaKind {
    fn from(value: String) -> Self {
        MediaKind::parse(&value)
    }
}

impl From<MediaKind> for String {
    fn from(value: MediaKind) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Longest display time accepted for an item (about 136 years).
pub const MAX_DISPLAY_SECONDS: f64 = u32::MAX as f64;

/// Converts a display time in seconds, or `None` when it is not a finite
/// value in `(0, MAX_DISPLAY_SECONDS]` or rounds down to zero.
pub fn display_duration(seconds: f64) -> Option<Duration> {
    if !seconds.is_finite() || seconds <= 0.0 || seconds > MAX_DISPLAY_SECONDS {
        return None;
    }
    Duration::try_from_secs_f64(seconds)
        .ok()
        .filter(|duration| !duration.is_zero())
}

/// One piece of content to put on screen.
///
/// Items are immutable once built; a changed playlist is delivered as a
/// whole new [`PlaylistSnapshot`].
#[derive(Clone, Debug, PartialEq)]
pub struct PlaylistItem {
    id: ItemId,
    display_name: String,
    media_kind: MediaKind,
    source_ref: String,
    display_time: Duration,
}

impl PlaylistItem {
    /// Builds an item, rejecting display times [`display_duration`] refuses.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        media_kind: MediaKind,
        source_ref: impl Into<String>,
        display_seconds: f64,
    ) -> Result<Self> {
        let id = id.into();
        let Some(display_time) = display_duration(display_seconds) else {
            return Err(DisplayError::invalid_item(format!(
                "item {id}: display time must be between 1ns and {MAX_DISPLAY_SECONDS} seconds, got {display_seconds}"
            )));
        };
        Ok(Self {
            id: ItemId(id),
            display_name: display_name.into(),
            media_kind,
            source_ref: source_ref.into(),
            display_time,
        })
    }

    pub fn id(&self) -> &ItemId {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn media_kind(&self) -> &MediaKind {
        &self.media_kind
    }

    /// Locator handed to the screen; never interpreted by the engine.
    pub fn source_ref(&self) -> &str {
        &self.source_ref
    }

    pub fn display_time(&self) -> Duration {
        self.display_time
    }

    pub fn display_seconds(&self) -> f64 {
        self.display_time.as_secs_f64()
    }
}

/// Ordered list of items; insertion order is display order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaylistSnapshot {
    items: Vec<PlaylistItem>,
}

impl PlaylistSnapshot {
    pub fn new(items: Vec<PlaylistItem>) -> Self {
        Self { items }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PlaylistItem> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[PlaylistItem] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlaylistItem> {
        self.items.iter()
    }
}

impl FromIterator<PlaylistItem> for PlaylistSnapshot {
    fn from_iter<I: IntoIterator<Item = PlaylistItem>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PlaylistSnapshot {
    type Item = &'a PlaylistItem;
    type IntoIter = std::slice::Iter<'a, PlaylistItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_parse() {
        assert_eq!(MediaKind::parse("video"), MediaKind::Video);
        assert_eq!(MediaKind::parse(" PDF "), MediaKind::Pdf);
        assert_eq!(MediaKind::parse("Document"), MediaKind::Document);
        assert_eq!(
            MediaKind::parse("hologram"),
            MediaKind::Unknown("hologram".to_string())
        );
    }

    #[test]
    fn test_media_kind_from_file_name() {
        assert_eq!(MediaKind::from_file_name("clip.MP4"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_file_name("a.b.avi"), Some(MediaKind::Video));
        assert_eq!(
            MediaKind::from_file_name("sales.xlsx"),
            Some(MediaKind::Document)
        );
        assert_eq!(MediaKind::from_file_name("sales.csv"), Some(MediaKind::Document));
        assert_eq!(MediaKind::from_file_name("report.pdf"), Some(MediaKind::Pdf));
        assert_eq!(MediaKind::from_file_name("notes.txt"), None);
        assert_eq!(MediaKind::from_file_name("README"), None);
    }

    #[test]
    fn test_media_kind_serde_keeps_unknown_values() {
        let kinds: Vec<MediaKind> = serde_json::from_str(r#"["video","pdf","gif"]"#).unwrap();
        assert_eq!(
            kinds,
            vec![
                MediaKind::Video,
                MediaKind::Pdf,
                MediaKind::Unknown("gif".to_string())
            ]
        );
        assert_eq!(
            serde_json::to_string(&MediaKind::Document).unwrap(),
            r#""document""#
        );
    }

    #[test]
    fn test_item_rejects_non_positive_display_time() {
        assert!(PlaylistItem::new("1", "a", MediaKind::Video, "u", 0.0).is_err());
        assert!(PlaylistItem::new("1", "a", MediaKind::Video, "u", -3.0).is_err());
        assert!(PlaylistItem::new("1", "a", MediaKind::Video, "u", f64::NAN).is_err());

        let item = PlaylistItem::new("1", "a", MediaKind::Video, "u", 2.5).unwrap();
        assert_eq!(item.display_time(), Duration::from_millis(2500));
        assert_eq!(item.id().to_string(), "1");
    }

    #[test]
    fn test_item_rejects_out_of_range_display_time() {
        for seconds in [1e-12, 1e19, 1e20, MAX_DISPLAY_SECONDS * 2.0, f64::INFINITY] {
            assert!(
                PlaylistItem::new("1", "a", MediaKind::Pdf, "u", seconds).is_err(),
                "{seconds} accepted"
            );
        }

        let longest = PlaylistItem::new("1", "a", MediaKind::Pdf, "u", MAX_DISPLAY_SECONDS).unwrap();
        assert_eq!(longest.display_time(), Duration::from_secs(u32::MAX as u64));
        assert!(display_duration(1e-9).is_some());
        assert!(display_duration(1e-10).is_none());
    }

    #[test]
    fn test_snapshot_preserves_order() {
        let snapshot: PlaylistSnapshot = ["c", "a", "b"]
            .iter()
            .map(|name| PlaylistItem::new(*name, *name, MediaKind::Pdf, "u", 1.0).unwrap())
            .collect();
        let names: Vec<_> = snapshot.iter().map(|i| i.display_name()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
        assert!(!snapshot.is_empty());
        assert!(PlaylistSnapshot::empty().is_empty());
    }
}
