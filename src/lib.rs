//! # Bindery
//!
//! Turns syndicated feed entries into a single FictionBook (FB2) e-book.
//!
//! ## Architecture
//!
//! ```text
//! FeedEntry → FullContentResolver → ImageExtractor → tokenize → markup → BookBuilder
//! ```
//!
//! - [`fullcontent`]: fetches the complete article body when a feed only
//!   carries a truncated summary
//! - [`images`]: downloads embedded images, recodes them to small grayscale
//!   JPEGs and rewrites their references
//! - [`tokenizer`]: HTML token stream consumed by the rest of the pipeline
//! - [`markup`]: maps HTML tokens onto the FB2 style vocabulary
//! - [`book`]: runs entries through the pipeline in parallel, groups them by
//!   feed and serializes the final document
//!
//! The windowed UI, the feed-service client and the external e-book
//! converter are collaborators, not part of this crate: entries arrive
//! already normalized, and the produced FB2 byte stream is handed back to
//! the caller.

/// Error type shared across the crate.
pub mod app;

/// Book-level configuration, loadable from TOML.
pub mod config;

/// Core domain models.
///
/// - [`FeedEntry`](domain::FeedEntry): one normalized feed entry
/// - [`FeedOptions`](domain::FeedOptions): per-feed processing switches
/// - [`TransformedEntry`](domain::TransformedEntry): the per-entry result
/// - [`ImageAsset`](domain::ImageAsset): a recoded inline binary
pub mod domain;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): async trait for all outbound requests
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// Full-content resolution for feeds that only ship summaries.
pub mod fullcontent;

/// Image discovery, recoding and reference rewriting.
pub mod images;

/// HTML token stream to FB2 markup mapping.
pub mod markup;

/// HTML tokenization (a thin layer over html5ever's tokenizer).
pub mod tokenizer;

/// Document assembly: parallel per-entry transform, grouping, serialization.
pub mod book;

pub use app::{BinderyError, Result};
pub use book::{BookBuilder, Progress};
pub use config::BookConfig;
pub use domain::{Feed, FeedEntry, FeedOptions, ImageAsset, TransformedEntry};
pub use fetcher::{Fetcher, HttpFetcher};
