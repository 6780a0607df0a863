use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A feed as the caller knows it: just enough to group and label entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    pub id: i64,
    pub title: String,
}

/// One normalized feed entry, as delivered by the feed-service client.
///
/// Read-only to the pipeline: transformation produces a separate
/// [`TransformedEntry`] instead of rewriting `content` in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEntry {
    pub id: String,
    pub feed_id: i64,
    pub title: String,
    pub link: Option<String>,
    /// Raw HTML body (summary or full article, whatever the feed carried).
    pub content: String,
    pub published_at: DateTime<Utc>,
}

impl FeedEntry {
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(Untitled)"
        } else {
            &self.title
        }
    }
}

/// Per-feed processing switches, supplied by the caller and never mutated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedOptions {
    pub enabled: bool,
    pub load_images: bool,
    pub full_content: bool,
    /// Consumed by the feed client when fetching (how far back to read);
    /// the transform pipeline itself ignores it.
    pub load_all_entries: bool,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            load_images: true,
            full_content: false,
            load_all_entries: false,
        }
    }
}

/// The per-entry result of the pipeline: ready-to-embed FB2 markup plus the
/// labels needed for grouping and ordering.
#[derive(Debug, Clone)]
pub struct TransformedEntry {
    pub feed_title: String,
    pub entry_title: String,
    pub published_at: DateTime<Utc>,
    pub markup: String,
}

/// A recoded inline image, owned by the document being assembled.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    /// Unique within one document, in the `{n}.jpg` format.
    pub name: String,
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

impl ImageAsset {
    pub fn jpeg(name: String, bytes: Vec<u8>) -> Self {
        Self {
            name,
            bytes,
            content_type: "image/jpeg",
        }
    }
}
