//! Book-level configuration.
//!
//! Everything here has a sensible default; a caller can run with
//! `BookConfig::default()` or load overrides from a TOML file. Image
//! recoding parameters (bounding box, JPEG quality) are deliberately fixed
//! constants, not configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app::{BinderyError, Result};

/// Configuration for one book-building run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookConfig {
    /// Book title written to `title-info`.
    pub title: String,

    /// Two-letter language code written to `title-info`.
    pub language: String,

    /// Maximum number of entries transformed concurrently (default: 8).
    pub workers: usize,

    /// Images whose URL contains any of these substrings are left alone.
    pub blocked_image_urls: Vec<String>,

    /// PNG used for the `cover.png` binary. Missing file fails the run.
    pub cover_path: PathBuf,

    /// Sort feed groups by title instead of keeping first-seen order.
    pub sort_groups: bool,

    /// Append a visible notice to an entry when a supported site's full
    /// content could not be downloaded.
    pub full_content_notice: bool,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            title: "bindery feeds".to_string(),
            language: "en".to_string(),
            workers: 8,
            blocked_image_urls: vec![
                "doubleclick.net/".to_string(),
                "feeds.feedburner.com/".to_string(),
            ],
            cover_path: PathBuf::from("resources/cover.png"),
            sort_groups: true,
            full_content_notice: true,
        }
    }
}

impl BookConfig {
    /// Parse a TOML document. Missing fields use default values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| BinderyError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_blocklist() {
        let config = BookConfig::default();
        assert!(config
            .blocked_image_urls
            .iter()
            .any(|s| s.contains("doubleclick")));
        assert!(config.workers > 0);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = BookConfig::from_toml_str(
            r#"
            title = "my feeds"
            workers = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.title, "my feeds");
        assert_eq!(config.workers, 2);
        // untouched fields keep their defaults
        assert_eq!(config.language, "en");
        assert!(config.sort_groups);
    }

    #[test]
    fn test_from_toml_invalid() {
        assert!(BookConfig::from_toml_str("workers = \"many\"").is_err());
    }
}
