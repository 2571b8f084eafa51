use feed_rs::model;
use feed_rs::parser;
use thiserror::Error;

use crate::digest::{Entry, PublishedTime};
use crate::util::strip_control_chars;

/// Feed bytes could not be parsed as RSS, Atom or JSON Feed.
#[derive(Debug, Error)]
#[error("Feed parse error: {0}")]
pub struct ParseError(#[from] parser::ParseFeedError);

/// A parsed feed: its display title and its first entries.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<Entry>,
}

/// Parses a feed document into digest entries.
///
/// At most `max_entries` entries are kept, in document order. Every entry is
/// stamped with `fetched_at` and with the feed title as its source, falling
/// back to `feed_url` when the feed has no title.
pub fn parse_feed(
    bytes: &[u8],
    feed_url: &str,
    max_entries: usize,
    fetched_at: i64,
) -> Result<ParsedFeed, ParseError> {
    let feed = parser::parse(bytes)?;

    let title = feed
        .title
        .map(|t| clean_title(&t.content))
        .filter(|t| !t.is_empty());
    let source = title.clone().unwrap_or_else(|| feed_url.to_string());

    let entries = feed
        .entries
        .into_iter()
        .take(max_entries)
        .map(|entry| into_entry(entry, &source, fetched_at))
        .collect();

    Ok(ParsedFeed { title, entries })
}

fn into_entry(entry: model::Entry, source: &str, fetched_at: i64) -> Entry {
    let published_at = entry.published.or(entry.updated);
    let thumbnail = thumbnail(&entry.media);

    Entry {
        title: entry
            .title
            .map(|t| clean_title(&t.content))
            .unwrap_or_default(),
        link: entry
            .links
            .into_iter()
            .next()
            .map(|l| l.href)
            .unwrap_or_default(),
        published: published_at.map(|dt| dt.to_rfc2822()).unwrap_or_default(),
        published_parsed: published_at.map(PublishedTime::from),
        content: entry.content.and_then(|c| c.body),
        summary: entry.summary.map(|s| s.content).unwrap_or_default(),
        thumbnail,
        source: source.to_string(),
        timestamp: fetched_at,
    }
}

fn clean_title(raw: &str) -> String {
    strip_control_chars(raw).trim().to_string()
}

/// First explicit thumbnail, else the first image attachment.
fn thumbnail(media: &[model::MediaObject]) -> Option<String> {
    let explicit = media
        .iter()
        .flat_map(|m| m.thumbnails.iter())
        .map(|t| t.image.uri.clone())
        .next();

    explicit.or_else(|| {
        media
            .iter()
            .flat_map(|m| m.content.iter())
            .filter(|c| {
                c.content_type
                    .as_ref()
                    .is_some_and(|ct| ct.ty().as_str() == "image")
            })
            .find_map(|c| c.url.as_ref().map(|u| u.to_string()))
    })
}
