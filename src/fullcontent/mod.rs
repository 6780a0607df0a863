//! Full-content resolution.
//!
//! Feeds frequently carry only a truncated summary. For a known set of
//! sites a specialized extractor knows the lightweight page variant and the
//! exact content container; for everything else a readability-style
//! fallback guesses the main content. Resolution never propagates a fault:
//! any fetch or extraction failure yields `None` and the caller keeps the
//! summary it already has.

pub mod generic;
pub mod habr;

pub use generic::GenericExtractor;
pub use habr::HabrExtractor;

use std::sync::Arc;

use crate::fetcher::Fetcher;

/// A site-specific article extractor. The set of implementations is closed
/// and registered once at startup; adding a site means adding a type here,
/// not reflecting over anything at runtime.
pub trait SiteExtractor: Send + Sync {
    /// Whether this extractor handles the URL.
    fn matches(&self, url: &str) -> bool;

    /// Rewrite the URL before fetching, e.g. to the lightweight mobile
    /// variant of the page.
    fn canonicalize(&self, url: &str) -> String;

    /// Pull the article body out of the fetched page.
    fn extract(&self, html: &str) -> Option<String>;
}

/// Strategy registry for full-content resolution.
///
/// Policy: the first registered extractor whose `matches` succeeds wins;
/// when none matches, the generic fallback runs. The registry is read-only
/// after construction and safe to share across workers.
pub struct FullContentResolver {
    fetcher: Arc<dyn Fetcher>,
    extractors: Vec<Box<dyn SiteExtractor>>,
    generic: GenericExtractor,
}

impl FullContentResolver {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            extractors: vec![Box::new(HabrExtractor)],
            generic: GenericExtractor::default(),
        }
    }

    /// True when a site-specific extractor claims this URL. Used by the
    /// caller to distinguish "supported site failed" (worth a visible
    /// notice) from "generic guess failed" (silent fallback).
    pub fn has_specific(&self, url: &str) -> bool {
        self.extractors.iter().any(|e| e.matches(url))
    }

    /// Fetch and extract the full article for `url`, or `None`.
    pub async fn resolve(&self, url: &str) -> Option<String> {
        if let Some(extractor) = self.extractors.iter().find(|e| e.matches(url)) {
            let canonical = extractor.canonicalize(url);
            return match self.fetcher.fetch_text(&canonical).await {
                Ok(page) => extractor.extract(&page),
                Err(e) => {
                    tracing::warn!("Full content fetch failed for '{canonical}': {e}");
                    None
                }
            };
        }

        match self.fetcher.fetch_text(url).await {
            Ok(page) => self.generic.extract(&page),
            Err(e) => {
                tracing::debug!("Generic content fetch failed for '{url}': {e}");
                None
            }
        }
    }
}
