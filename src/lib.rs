//! Aggregates RSS/Atom feeds into a deduplicated, newest-first, summarized
//! daily email digest.
//!
//! - [`digest`] - the pure processing pipeline (dedup, sort, summarize)
//! - [`feed`] - fetching, parsing and health-checking feeds
//! - [`email`] - HTML/text rendering and SMTP delivery
//! - [`config`] - TOML configuration
//! - [`scheduler`] - daily run loop

pub mod config;
pub mod digest;
pub mod email;
pub mod feed;
pub mod scheduler;
pub mod util;
