use askama::Template;
use thiserror::Error;

use crate::digest::Entry;

#[derive(Debug, Error)]
#[error("Failed to render digest template: {0}")]
pub struct RenderError(#[from] askama::Error);

struct ItemView<'a> {
    title: &'a str,
    link: &'a str,
    /// "source published", empty when both are missing.
    meta: String,
    summary: &'a str,
    thumbnail: &'a str,
}

#[derive(Template)]
#[template(path = "digest.html")]
struct DigestTemplate<'a> {
    subject: &'a str,
    items: Vec<ItemView<'a>>,
}

fn meta_line(entry: &Entry) -> String {
    format!("{} {}", entry.source, entry.published)
        .trim()
        .to_string()
}

/// Renders the HTML email body. All entry text is HTML-escaped.
pub fn render_html(entries: &[Entry], subject: &str) -> Result<String, RenderError> {
    let items = entries
        .iter()
        .map(|e| ItemView {
            title: &e.title,
            link: &e.link,
            meta: meta_line(e),
            summary: &e.summary,
            thumbnail: e.thumbnail.as_deref().unwrap_or(""),
        })
        .collect();

    Ok(DigestTemplate { subject, items }.render()?)
}

/// Renders the plain-text alternative body.
///
/// ```text
/// Subject
///
/// • Title
/// Source Published
///   https://link
///   Summary text
/// ```
pub fn render_text(entries: &[Entry], subject: &str) -> String {
    let mut lines: Vec<String> = vec![subject.to_string(), String::new()];

    for entry in entries {
        lines.push(format!("• {}", entry.title));
        let meta = meta_line(entry);
        if !meta.is_empty() {
            lines.push(meta);
        }
        lines.push(format!("  {}", entry.link));
        if !entry.summary.is_empty() {
            lines.push(format!("  {}", entry.summary));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}
