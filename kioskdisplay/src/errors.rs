//! Error types for the display engine and its playlist sources.

/// Result type alias for display operations
pub type Result<T> = std::result::Result<T, DisplayError>;

/// Errors raised by playlist sources and content surfaces.
///
/// None of these are fatal to the rotation: the engine degrades every one
/// of them to the empty-state placeholder.
#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The playlist API answered with a non-success status
    #[error("Playlist API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid playlist item: {0}")]
    InvalidItem(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A screen refused to mount a surface
    #[error("Render error: {0}")]
    Render(String),

    #[error("Playlist source error: {0}")]
    Source(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DisplayError {
    pub fn invalid_item(msg: impl Into<String>) -> Self {
        Self::InvalidItem(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn source_failure(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }
}
