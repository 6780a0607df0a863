//! Image discovery, recoding and reference rewriting.
//!
//! Works on the raw HTML text rather than the token stream: the URL spans
//! must be rewritten in place at exact byte offsets before the text is
//! tokenized. E-ink targets want small grayscale images, so everything is
//! recoded to a bounded, low-quality JPEG.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::sync::LazyLock;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use regex::Regex;
use url::Url;

use crate::app::Result;
use crate::domain::ImageAsset;
use crate::fetcher::Fetcher;

/// Bounding box images are shrunk into. Never upsampled.
const MAX_DIMENSION: u32 = 800;

/// Fixed JPEG quality, chosen for small output size.
const JPEG_QUALITY: u8 = 40;

/// `src` attribute values of `img` tags; group 1 is the URL span.
static IMG_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img[^>]*?\bsrc\s*=\s*["']([^"']*)["']"#).expect("valid regex")
});

/// Hands out `{n}.jpg` names from an atomic counter. One sequence is owned
/// by each book-building run and shared by its workers, so names are unique
/// within the document no matter how entries interleave.
#[derive(Debug, Default)]
pub struct NameSequence {
    counter: AtomicU64,
}

impl NameSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_name(&self) -> String {
        format!("{}.jpg", self.counter.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Strip doubled scheme prefixes (`https://http://…`) down to the last
/// one. Syndicated content grows these when producers concatenate URLs.
pub fn repair_scheme(url: &str) -> &str {
    let mut url = url;
    loop {
        let rest = url
            .strip_prefix("http://")
            .or_else(|| url.strip_prefix("https://"));
        match rest {
            Some(rest) if rest.starts_with("http://") || rest.starts_with("https://") => {
                url = rest;
            }
            _ => return url,
        }
    }
}

fn is_absolute_http(url: &str) -> bool {
    Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

pub struct ImageExtractor {
    fetcher: Arc<dyn Fetcher>,
    names: Arc<NameSequence>,
    blocked: Vec<String>,
}

impl ImageExtractor {
    pub fn new(fetcher: Arc<dyn Fetcher>, names: Arc<NameSequence>, blocked: Vec<String>) -> Self {
        Self {
            fetcher,
            names,
            blocked,
        }
    }

    /// Download, recode and rename every embedded image, rewriting the URL
    /// spans in `html` to the generated names. A failed image is logged and
    /// left untouched; it never fails the entry.
    ///
    /// Matches are processed in reverse document order so earlier byte
    /// offsets stay valid after each rewrite.
    pub async fn extract_images(&self, html: &mut String) -> Vec<ImageAsset> {
        let candidates: Vec<(std::ops::Range<usize>, String)> = IMG_SRC
            .captures_iter(html)
            .filter_map(|caps| caps.get(1))
            .map(|m| (m.range(), m.as_str().to_string()))
            .filter(|(_, url)| !self.blocked.iter().any(|bad| url.contains(bad)))
            .collect();

        let mut assets = Vec::new();
        for (range, raw_url) in candidates.into_iter().rev() {
            let url = repair_scheme(&raw_url);
            if !is_absolute_http(url) {
                tracing::debug!("Skipping non-absolute image URL '{url}'");
                continue;
            }

            match self.recode(url).await {
                Ok(bytes) => {
                    let name = self.names.next_name();
                    html.replace_range(range, &name);
                    assets.push(ImageAsset::jpeg(name, bytes));
                }
                Err(e) => {
                    tracing::warn!("Can't load or convert image from '{url}': {e}");
                }
            }
        }
        assets
    }

    async fn recode(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self.fetcher.fetch_bytes(url).await?;
        recode_to_jpeg(&bytes)
    }
}

/// Decode, grayscale, shrink into the bounding box (aspect ratio kept, no
/// upsampling) and re-encode as JPEG.
pub fn recode_to_jpeg(bytes: &[u8]) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(bytes)?;
    let gray = DynamicImage::ImageLuma8(decoded.to_luma8());

    let shrunk = if gray.width() > MAX_DIMENSION || gray.height() > MAX_DIMENSION {
        gray.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3)
    } else {
        gray
    };

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    shrunk.write_with_encoder(encoder)?;
    Ok(out)
}
