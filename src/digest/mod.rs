//! Entry processing pipeline: deduplication, chronological ordering and
//! extractive summarization.
//!
//! Everything in this module is synchronous and infallible. It operates on
//! an already-fetched `Vec<Entry>` and never performs I/O.
//!
//! # Example
//!
//! ```
//! use rss_digest::digest::{build_digest, Entry, Limits};
//!
//! let entries = vec![
//!     Entry { title: "Hello".into(), link: "http://x.com/a".into(), ..Default::default() },
//!     Entry { title: "Hello again".into(), link: "http://x.com/a".into(), ..Default::default() },
//! ];
//! let digest = build_digest(entries, &Limits::default());
//! assert_eq!(digest.len(), 1);
//! ```

mod dedup;
mod entry;
mod sort;
mod summarize;

pub use dedup::deduplicate;
pub use entry::{Entry, PublishedTime};
pub use sort::sort_by_published_descending;
pub use summarize::{summarize, summarize_text};

use serde::Deserialize;

/// Per-run size limits, read from the `[limits]` config table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum entries taken from each feed.
    pub max_per_feed: usize,
    /// Maximum sentences in each entry summary.
    pub max_sentences: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_per_feed: 10,
            max_sentences: 3,
        }
    }
}

/// Runs the full pipeline: deduplicate, sort newest first, summarize.
pub fn build_digest(entries: Vec<Entry>, limits: &Limits) -> Vec<Entry> {
    let entries = deduplicate(entries);
    let entries = sort_by_published_descending(entries);
    summarize(entries, limits.max_sentences)
}
