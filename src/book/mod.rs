//! Document assembly.
//!
//! Runs every enabled entry through the pipeline (full-content resolution,
//! image extraction, tokenization, markup mapping) under a bounded worker
//! pool, then groups the results by feed and serializes the book. Grouping
//! and serialization are a single-threaded final phase: they start only
//! after every entry has finished or been skipped.

pub mod fb2;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::app::{BinderyError, Result};
use crate::config::BookConfig;
use crate::domain::{Feed, FeedEntry, FeedOptions, ImageAsset, TransformedEntry};
use crate::fetcher::Fetcher;
use crate::fullcontent::FullContentResolver;
use crate::images::{ImageExtractor, NameSequence};
use crate::markup::to_markup;
use crate::tokenizer::tokenize;

/// Invoked after each entry completes with `(processed, total)`. Counts are
/// monotonically non-decreasing and reach the total exactly once; ordering
/// across workers is not guaranteed.
pub type Progress = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Entries grouped by feed title, in output order.
pub type EntryGroups = Vec<(String, Vec<TransformedEntry>)>;

pub struct BookBuilder {
    config: BookConfig,
    fetcher: Arc<dyn Fetcher>,
}

impl BookBuilder {
    pub fn new(config: BookConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { config, fetcher }
    }

    /// Transform all entries, assemble the document and write it out.
    ///
    /// A missing cover file fails the whole run; per-entry trouble never
    /// does.
    pub async fn build<W: std::io::Write>(
        &self,
        feeds: &[Feed],
        options: &HashMap<i64, FeedOptions>,
        entries: Vec<FeedEntry>,
        progress: Option<Progress>,
        writer: W,
    ) -> Result<()> {
        let (groups, binaries) = self.transform(feeds, options, entries, progress).await?;
        let cover = std::fs::read(&self.config.cover_path)?;
        fb2::write_book(writer, &self.config, &groups, &binaries, &cover)
    }

    /// The parallel per-entry fan-out plus grouping. Exposed separately so a
    /// caller can inspect the grouped result before serialization.
    pub async fn transform(
        &self,
        feeds: &[Feed],
        options: &HashMap<i64, FeedOptions>,
        entries: Vec<FeedEntry>,
        progress: Option<Progress>,
    ) -> Result<(EntryGroups, Vec<ImageAsset>)> {
        let titles: HashMap<i64, String> = feeds
            .iter()
            .map(|feed| (feed.id, feed.title.clone()))
            .collect();

        for entry in &entries {
            if !titles.contains_key(&entry.feed_id) {
                return Err(BinderyError::Contract(format!(
                    "entry '{}' references unknown feed {}",
                    entry.id, entry.feed_id
                )));
            }
            if !options.contains_key(&entry.feed_id) {
                return Err(BinderyError::Contract(format!(
                    "no options supplied for feed {}",
                    entry.feed_id
                )));
            }
        }

        let work: Vec<FeedEntry> = entries
            .into_iter()
            .filter(|entry| options[&entry.feed_id].enabled)
            .collect();
        let total = work.len();
        tracing::info!("Processing {total} feed entries");

        let names = Arc::new(NameSequence::new());
        let resolver = Arc::new(FullContentResolver::new(self.fetcher.clone()));
        let semaphore = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let processed = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for entry in work {
            let feed_title = titles[&entry.feed_id].clone();
            let entry_options = options[&entry.feed_id];
            let fetcher = self.fetcher.clone();
            let names = names.clone();
            let resolver = resolver.clone();
            let semaphore = semaphore.clone();
            let processed = processed.clone();
            let progress = progress.clone();
            let blocked = self.config.blocked_image_urls.clone();
            let notice = self.config.full_content_notice;

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("Semaphore closed");

                let extractor = ImageExtractor::new(fetcher, names, blocked);
                let result =
                    transform_entry(entry, feed_title, entry_options, &resolver, &extractor, notice)
                        .await;

                let done = processed.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(callback) = &progress {
                    callback(done, total);
                }
                result
            }));
        }

        let mut transformed = Vec::new();
        let mut binaries = Vec::new();
        for handle in join_all(handles).await {
            match handle {
                Ok((entry, assets)) => {
                    transformed.push(entry);
                    binaries.extend(assets);
                }
                Err(e) => tracing::error!("Task join error: {e}"),
            }
        }

        Ok((self.group(transformed), binaries))
    }

    /// Group by feed title. Groups keep first-seen order unless configured
    /// to sort by title; entries within a group are most recent first.
    fn group(&self, transformed: Vec<TransformedEntry>) -> EntryGroups {
        let mut order: Vec<String> = Vec::new();
        let mut by_title: HashMap<String, Vec<TransformedEntry>> = HashMap::new();
        for entry in transformed {
            if !by_title.contains_key(&entry.feed_title) {
                order.push(entry.feed_title.clone());
            }
            by_title
                .entry(entry.feed_title.clone())
                .or_default()
                .push(entry);
        }

        if self.config.sort_groups {
            order.sort();
        }

        order
            .into_iter()
            .map(|title| {
                let mut group = by_title.remove(&title).unwrap_or_default();
                group.sort_by(|a, b| b.published_at.cmp(&a.published_at));
                (title, group)
            })
            .collect()
    }
}

/// The whole per-entry pipeline. Pure with respect to the entry: the input
/// is never mutated, all per-item failures degrade to the summary content.
async fn transform_entry(
    entry: FeedEntry,
    feed_title: String,
    options: FeedOptions,
    resolver: &FullContentResolver,
    extractor: &ImageExtractor,
    notice: bool,
) -> (TransformedEntry, Vec<ImageAsset>) {
    let mut content = entry.content.clone();

    if options.full_content {
        if let Some(link) = &entry.link {
            match resolver.resolve(link).await {
                Some(full) => content = full,
                None => {
                    tracing::warn!("Full content unavailable for '{link}', keeping summary");
                    if notice && resolver.has_specific(link) {
                        content.push_str(&format!(
                            "<hr/>[Full article content couldn't be downloaded, \
                             although url <u>{link}</u> is supported]"
                        ));
                    }
                }
            }
        }
    }

    let assets = if options.load_images {
        extractor.extract_images(&mut content).await
    } else {
        Vec::new()
    };

    let markup = to_markup(tokenize(&content));

    let transformed = TransformedEntry {
        feed_title,
        entry_title: entry.display_title().to_string(),
        published_at: entry.published_at,
        markup,
    };
    (transformed, assets)
}
