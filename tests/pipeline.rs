//! Integration tests for the in-memory digest pipeline: dedup, sort and
//! summarize composed through the public API.

use pretty_assertions::assert_eq;
use rss_digest::digest::{build_digest, Entry, Limits, PublishedTime};

const LONG_BODY: &str = "Rust compilers generate fast native code for every platform. \
    The borrow checker prevents data races at compile time. \
    Many teams adopt Rust compilers for systems programming work. \
    Tooling around Cargo makes builds reproducible for teams. \
    The weather was pleasant during the whole conference week.";

fn jan_2_2024() -> PublishedTime {
    PublishedTime {
        year: 2024,
        month: 1,
        day: 2,
        hour: 0,
        minute: 0,
        second: 0,
    }
}

fn sentence_count(summary: &str) -> usize {
    summary.matches(". ").count() + usize::from(summary.ends_with('.'))
}

#[test]
fn test_duplicate_link_then_sort_then_summarize() {
    let a = Entry {
        title: "Compiler news".into(),
        link: "http://x.com/a".into(),
        published_parsed: Some(jan_2_2024()),
        content: Some(LONG_BODY.into()),
        timestamp: 1_000,
        ..Default::default()
    };
    let b = Entry {
        title: "Compiler news, again".into(),
        link: "http://x.com/a".into(),
        content: Some("Entirely different content that should never be seen.".into()),
        timestamp: 2_000,
        ..Default::default()
    };
    // No parsed date, fetch timestamp older than A's publication time.
    let c = Entry {
        title: "Older item".into(),
        link: "http://x.com/c".into(),
        summary: "A short summary that is long enough to count.".into(),
        timestamp: 1_600_000_000,
        ..Default::default()
    };

    let limits = Limits {
        max_per_feed: 10,
        max_sentences: 2,
    };
    let digest = build_digest(vec![c, a, b], &limits);

    let titles: Vec<&str> = digest.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Compiler news", "Older item"]);

    let summary = &digest[0].summary;
    assert!(!summary.is_empty());
    assert!(sentence_count(summary) <= 2, "too many sentences: {summary}");
    assert!(!summary.contains("Entirely different"));
    assert_eq!(digest[1].summary, "A short summary that is long enough to count.");
}

#[test]
fn test_fallback_timestamp_newer_than_parsed_date_sorts_first() {
    let dated = Entry {
        title: "Dated".into(),
        link: "http://x.com/dated".into(),
        published_parsed: Some(jan_2_2024()),
        ..Default::default()
    };
    let undated = Entry {
        title: "Undated".into(),
        link: "http://x.com/undated".into(),
        timestamp: 1_800_000_000,
        ..Default::default()
    };

    let digest = build_digest(vec![dated, undated], &Limits::default());
    let titles: Vec<&str> = digest.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Undated", "Dated"]);
}

#[test]
fn test_same_title_different_links_keeps_first() {
    let first = Entry {
        title: "Same headline".into(),
        link: "http://one.example.com/story".into(),
        timestamp: 10,
        ..Default::default()
    };
    let second = Entry {
        title: "Same headline".into(),
        link: "http://two.example.com/story".into(),
        timestamp: 20,
        ..Default::default()
    };

    let digest = build_digest(vec![first, second], &Limits::default());
    assert_eq!(digest.len(), 1);
    assert_eq!(digest[0].link, "http://one.example.com/story");
}

#[test]
fn test_entry_without_body_gets_empty_summary() {
    let entry = Entry {
        title: "Link only".into(),
        link: "http://x.com/link-only".into(),
        ..Default::default()
    };
    let digest = build_digest(vec![entry], &Limits::default());
    assert_eq!(digest[0].summary, "");
}

#[test]
fn test_empty_input() {
    assert!(build_digest(Vec::new(), &Limits::default()).is_empty());
}
