//! HTTP playlist source backed by the signage server REST API.
//!
//! The server exposes the active files at `GET /api/files/active` and serves
//! their content at `GET /api/serve/{filename}`. This client only reads the
//! active list; uploads, activation and user management stay with the
//! administrative UI.
//!
//! # Example
//!
//! ```no_run
//! use kioskdisplay::{PlaylistSource, RestPlaylistSource};
//!
//! # async fn example() -> kioskdisplay::Result<()> {
//! let source = RestPlaylistSource::builder()
//!     .base_url("http://signage.local:5000")
//!     .build()?;
//! let snapshot = source.fetch_active().await?;
//! println!("{} item(s) to display", snapshot.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::{DisplayError, Result};
use crate::model::{MediaKind, PlaylistItem, PlaylistSnapshot, display_duration};
use crate::source::PlaylistSource;

/// Default signage server URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Default timeout for HTTP requests (15 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Display time applied to items the server sends without a usable one
pub const DEFAULT_DISPLAY_SECONDS: f64 = 10.0;

pub const DEFAULT_USER_AGENT: &str = concat!("KioskSignage/", env!("CARGO_PKG_VERSION"));

/// Header carrying the display identifier
pub const DISPLAY_ID_HEADER: &str = "X-Display-Id";

const ACTIVE_FILES_PATH: &str = "/api/files/active";
const SERVE_PATH: &str = "/api/serve/";

/// Characters escaped in the file name path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Identifier as sent by the server (integer primary key today).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Number(n) => n.to_string(),
            RawId::Text(s) => s,
        }
    }
}

fn default_active() -> bool {
    true
}

/// One entry of `GET /api/files/active`. Extra fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct FileRecord {
    id: RawId,
    filename: String,
    #[serde(default)]
    original_name: Option<String>,
    #[serde(default)]
    file_type: Option<String>,
    #[serde(default)]
    display_time: Option<f64>,
    #[serde(default = "default_active")]
    is_active: bool,
}

impl FileRecord {
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Converts the wire record into an item, repairing what can be repaired.
    fn into_item(self, base_url: &str, default_display_seconds: f64) -> Result<PlaylistItem> {
        let id = self.id.into_string();

        let media_kind = match self.file_type.as_deref() {
            Some(raw) if !raw.trim().is_empty() => MediaKind::parse(raw),
            _ => MediaKind::from_file_name(&self.filename)
                .unwrap_or_else(|| MediaKind::Unknown(String::new())),
        };

        let display_name = match self.original_name {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.filename.clone(),
        };

        let display_seconds = match self.display_time {
            Some(secs) if display_duration(secs).is_some() => secs,
            other => {
                warn!(item = %id, display_time = ?other, default = default_display_seconds, "Invalid display time, using default");
                default_display_seconds
            }
        };

        let source_ref = format!(
            "{}{}{}",
            base_url,
            SERVE_PATH,
            utf8_percent_encode(&self.filename, PATH_SEGMENT)
        );

        PlaylistItem::new(id, display_name, media_kind, source_ref, display_seconds)
    }
}

/// Maps the server payload to a snapshot: inactive entries are dropped,
/// broken ones are skipped with a warning, order is preserved.
pub fn snapshot_from_records(
    records: Vec<FileRecord>,
    base_url: &str,
    default_display_seconds: f64,
) -> PlaylistSnapshot {
    records
        .into_iter()
        .filter(FileRecord::is_active)
        .filter_map(|record| match record.into_item(base_url, default_display_seconds) {
            Ok(item) => Some(item),
            Err(err) => {
                warn!(error = %err, "Skipping playlist entry");
                None
            }
        })
        .collect()
}

/// Playlist source reading the signage server REST API.
#[derive(Debug, Clone)]
pub struct RestPlaylistSource {
    client: Client,
    base_url: String,
    display_id: Option<String>,
    default_display_seconds: f64,
}

impl RestPlaylistSource {
    /// Create a source for `base_url` with default settings
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::builder().base_url(base_url).build()
    }

    pub fn builder() -> RestSourceBuilder {
        RestSourceBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn active_files_url(&self) -> String {
        format!("{}{}", self.base_url, ACTIVE_FILES_PATH)
    }
}

#[async_trait]
impl PlaylistSource for RestPlaylistSource {
    fn name(&self) -> &str {
        "rest"
    }

    async fn fetch_active(&self) -> Result<PlaylistSnapshot> {
        let url = self.active_files_url();
        debug!(url = %url, "Fetching active playlist");

        let mut request = self.client.get(&url);
        if let Some(id) = &self.display_id {
            request = request.header(DISPLAY_ID_HEADER, id);
        }
        let response = request.send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(DisplayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let records: Vec<FileRecord> = serde_json::from_str(&body)?;
        let snapshot = snapshot_from_records(records, &self.base_url, self.default_display_seconds);
        debug!(items = snapshot.len(), "Active playlist fetched");
        Ok(snapshot)
    }
}

/// Builder for [`RestPlaylistSource`]
pub struct RestSourceBuilder {
    client: Option<Client>,
    base_url: String,
    timeout: Duration,
    user_agent: String,
    display_id: Option<String>,
    default_display_seconds: f64,
}

impl Default for RestSourceBuilder {
    fn default() -> Self {
        Self {
            client: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            display_id: None,
            default_display_seconds: DEFAULT_DISPLAY_SECONDS,
        }
    }
}

impl RestSourceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom HTTP client
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Identifier sent with every request so the server can tell screens apart
    pub fn display_id(mut self, id: impl Into<String>) -> Self {
        self.display_id = Some(id.into());
        self
    }

    /// Display time for items without a positive one
    pub fn default_display_seconds(mut self, seconds: f64) -> Self {
        self.default_display_seconds = seconds;
        self
    }

    pub fn build(self) -> Result<RestPlaylistSource> {
        let base_url = self.base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(DisplayError::InvalidUrl(format!(
                "'{base_url}' is not an http(s) URL"
            )));
        }
        if display_duration(self.default_display_seconds).is_none() {
            return Err(DisplayError::invalid_item(format!(
                "default display time out of range, got {}",
                self.default_display_seconds
            )));
        }

        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .user_agent(&self.user_agent)
                .timeout(self.timeout)
                .build()?,
        };

        Ok(RestPlaylistSource {
            client,
            base_url,
            display_id: self.display_id,
            default_display_seconds: self.default_display_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://signage.local:5000";

    fn records(json: &str) -> Vec<FileRecord> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_records_map_to_items() {
        let snapshot = snapshot_from_records(
            records(
                r#"[
                {"id": 3, "filename": "a1.mp4", "original_name": "Welcome.mp4",
                 "file_type": "video", "display_time": 30, "is_active": true,
                 "upload_order": 1, "uploader_name": "Admin"},
                {"id": 4, "filename": "b2.pdf", "original_name": "Menu.pdf",
                 "file_type": "pdf", "display_time": 12.5, "is_active": true}
            ]"#,
            ),
            BASE,
            10.0,
        );

        assert_eq!(snapshot.len(), 2);
        let first = snapshot.get(0).unwrap();
        assert_eq!(first.id().0, "3");
        assert_eq!(first.display_name(), "Welcome.mp4");
        assert_eq!(first.media_kind(), &MediaKind::Video);
        assert_eq!(first.source_ref(), "http://signage.local:5000/api/serve/a1.mp4");
        assert_eq!(first.display_seconds(), 30.0);
        assert_eq!(snapshot.get(1).unwrap().display_seconds(), 12.5);
    }

    #[test]
    fn test_inactive_records_are_dropped() {
        let snapshot = snapshot_from_records(
            records(
                r#"[
                {"id": 1, "filename": "a.pdf", "file_type": "pdf", "display_time": 5, "is_active": false},
                {"id": 2, "filename": "b.pdf", "file_type": "pdf", "display_time": 5}
            ]"#,
            ),
            BASE,
            10.0,
        );
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get(0).unwrap().id().0, "2");
    }

    #[test]
    fn test_invalid_display_time_uses_default() {
        let snapshot = snapshot_from_records(
            records(
                r#"[
                {"id": 1, "filename": "a.pdf", "file_type": "pdf", "display_time": 0},
                {"id": 2, "filename": "b.pdf", "file_type": "pdf", "display_time": -4},
                {"id": 3, "filename": "c.pdf", "file_type": "pdf"}
            ]"#,
            ),
            BASE,
            8.0,
        );
        assert!(snapshot.iter().all(|item| item.display_seconds() == 8.0));
    }

    #[test]
    fn test_out_of_range_display_time_uses_default() {
        let snapshot = snapshot_from_records(
            records(
                r#"[
                {"id": 1, "filename": "a.pdf", "file_type": "pdf", "display_time": 1e19},
                {"id": 2, "filename": "b.pdf", "file_type": "pdf", "display_time": 1e20},
                {"id": 3, "filename": "c.pdf", "file_type": "pdf", "display_time": 1e-12}
            ]"#,
            ),
            BASE,
            8.0,
        );
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.iter().all(|item| item.display_seconds() == 8.0));
    }

    #[test]
    fn test_kind_inferred_from_extension_when_missing() {
        let snapshot = snapshot_from_records(
            records(
                r#"[
                {"id": "x", "filename": "sheet.ods", "display_time": 5},
                {"id": "y", "filename": "blob.bin", "display_time": 5},
                {"id": "z", "filename": "v.mp4", "file_type": "hologram", "display_time": 5}
            ]"#,
            ),
            BASE,
            10.0,
        );
        let kinds: Vec<_> = snapshot.iter().map(|i| i.media_kind().clone()).collect();
        assert_eq!(
            kinds,
            vec![
                MediaKind::Document,
                MediaKind::Unknown(String::new()),
                MediaKind::Unknown("hologram".to_string()),
            ]
        );
        // falls back to the stored file name when the original one is missing
        assert_eq!(snapshot.get(0).unwrap().display_name(), "sheet.ods");
    }

    #[test]
    fn test_file_name_is_escaped_in_locator() {
        let snapshot = snapshot_from_records(
            records(r#"[{"id": 1, "filename": "my file#1.pdf", "file_type": "pdf", "display_time": 5}]"#),
            BASE,
            10.0,
        );
        assert_eq!(
            snapshot.get(0).unwrap().source_ref(),
            "http://signage.local:5000/api/serve/my%20file%231.pdf"
        );
    }

    #[test]
    fn test_builder_validates_base_url() {
        assert!(RestPlaylistSource::new("signage.local").is_err());
        let source = RestPlaylistSource::new("http://signage.local:5000/").unwrap();
        assert_eq!(source.base_url(), BASE);
        assert_eq!(
            source.active_files_url(),
            "http://signage.local:5000/api/files/active"
        );
    }

    #[test]
    fn test_builder_rejects_out_of_range_default() {
        assert!(
            RestPlaylistSource::builder()
                .default_display_seconds(0.0)
                .build()
                .is_err()
        );
        assert!(
            RestPlaylistSource::builder()
                .default_display_seconds(1e20)
                .build()
                .is_err()
        );
    }
}
