pub mod http_fetcher;

pub use http_fetcher::HttpFetcher;

use async_trait::async_trait;

use crate::app::Result;

/// All outbound requests of the pipeline go through this trait: article
/// pages for full-content resolution and image downloads. Tests substitute
/// a canned implementation.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a URL and decode the response body as text.
    async fn fetch_text(&self, url: &str) -> Result<String>;

    /// Fetch a URL and return the raw response body.
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
}
