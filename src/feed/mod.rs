//! Feed retrieval for the digest.
//!
//! - `parser` - RSS/Atom parsing into [`crate::digest::Entry`] values using `feed-rs`
//! - `fetcher` - concurrent HTTP retrieval with retry and size limits
//! - `client` - the shared HTTP client (user agent, redirect policy)
//! - [`health`] - HEAD-request reachability checks used by `check` and `clean`
//!
//! # Example
//!
//! ```ignore
//! use rss_digest::feed::{collect_entries, RetryPolicy};
//!
//! let client = rss_digest::feed::build_client()?;
//! let entries = collect_entries(&client, &config.feeds, 10, &RetryPolicy::default()).await;
//! ```

mod client;
mod fetcher;
pub mod health;
mod parser;

pub use client::build_client;
pub use fetcher::{collect_entries, fetch_feed, FetchError, RetryPolicy};
pub use health::{check_feed_health, dead_feeds, format_health_report, FeedHealth};
pub use parser::{parse_feed, ParseError, ParsedFeed};
