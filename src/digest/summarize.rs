use std::collections::HashMap;

use super::Entry;
use crate::util::html_to_text;

/// Sentences whose trimmed length is at or below this many characters are
/// treated as noise (bylines, "Read more.", stray fragments).
const MIN_SENTENCE_CHARS: usize = 20;

/// Words shorter than this carry no weight in sentence scoring.
const MIN_TOKEN_CHARS: usize = 4;

type BodySource = fn(&Entry) -> &str;

/// Where to find the text to summarize, in priority order. The first
/// non-empty source wins.
const BODY_SOURCES: [BodySource; 2] = [content_body, summary_body];

fn content_body(entry: &Entry) -> &str {
    entry.content.as_deref().unwrap_or("")
}

fn summary_body(entry: &Entry) -> &str {
    &entry.summary
}

/// Replaces each entry's `summary` with an extractive summary of at most
/// `max_sentences` sentences.
///
/// Entries are independent of each other; output order matches input order.
pub fn summarize(entries: Vec<Entry>, max_sentences: usize) -> Vec<Entry> {
    let summarized: Vec<Entry> = entries
        .into_iter()
        .map(|mut entry| {
            let body = BODY_SOURCES
                .iter()
                .map(|source| source(&entry))
                .find(|text| !text.is_empty())
                .unwrap_or("");
            entry.summary = summarize_text(body, max_sentences);
            entry
        })
        .collect();

    tracing::debug!(
        entries = summarized.len(),
        max_sentences = max_sentences,
        "Summarized entries"
    );
    summarized
}

/// Produces an extractive summary of an HTML or plain-text body.
///
/// Sentences are ranked by the average corpus frequency of their words (4+
/// characters, counted within this body only). The best `max_sentences` are
/// selected, then emitted in document order. Bodies with no more than
/// `max_sentences` usable sentences are returned whole.
///
/// # Examples
///
/// ```
/// use rss_digest::digest::summarize_text;
///
/// let body = "<p>The release ships a brand new borrow checker.</p> \
///             <p>It was three years in the making.</p>";
/// assert_eq!(
///     summarize_text(body, 3),
///     "The release ships a brand new borrow checker. It was three years in the making."
/// );
/// ```
pub fn summarize_text(body: &str, max_sentences: usize) -> String {
    let text = html_to_text(body);
    if text.is_empty() {
        return String::new();
    }

    let sentences = split_sentences(&text);
    if sentences.len() <= max_sentences {
        return sentences.join(" ");
    }

    let mut selected = rank_sentences(&sentences);
    selected.truncate(max_sentences);
    selected.sort_unstable();

    selected
        .into_iter()
        .map(|idx| sentences[idx])
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits text after `.`, `!` or `?` when followed by whitespace, dropping
/// pieces that are too short to be real sentences.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let Some(&(next_idx, next)) = chars.peek() else {
            break;
        };
        if next.is_whitespace() {
            sentences.push(&text[start..next_idx]);
            while chars.peek().is_some_and(|(_, c)| c.is_whitespace()) {
                chars.next();
            }
            start = chars.peek().map_or(text.len(), |(i, _)| *i);
        }
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS)
        .collect()
}

/// Lowercased word tokens long enough to count towards scoring.
fn tokens(sentence: &str) -> impl Iterator<Item = String> + '_ {
    sentence
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|word| word.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_lowercase)
}

/// Returns sentence indices ordered by score, best first. Ties go to the
/// earlier sentence.
fn rank_sentences(sentences: &[&str]) -> Vec<usize> {
    let tokenized: Vec<Vec<String>> = sentences.iter().map(|s| tokens(s).collect()).collect();

    let mut frequency: HashMap<&str, usize> = HashMap::new();
    for token in tokenized.iter().flatten() {
        *frequency.entry(token.as_str()).or_insert(0) += 1;
    }

    let scores: Vec<f64> = tokenized
        .iter()
        .map(|words| {
            let total: usize = words.iter().map(|w| frequency[w.as_str()]).sum();
            total as f64 / words.len().max(1) as f64
        })
        .collect();

    let mut order: Vec<usize> = (0..sentences.len()).collect();
    // Stable sort over ascending indices keeps earlier sentences first on ties.
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order
}
