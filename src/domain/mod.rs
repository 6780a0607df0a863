pub mod entry;

pub use entry::{Feed, FeedEntry, FeedOptions, ImageAsset, TransformedEntry};
