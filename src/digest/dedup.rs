use std::collections::HashSet;

use sha2::{Digest, Sha256};

use super::Entry;

/// Removes duplicate entries, keeping the first occurrence of each.
///
/// An entry is a duplicate when its trimmed link was already seen, or when
/// its trimmed, lowercased title hashes to an already-seen fingerprint.
/// Empty links and empty titles never match anything, so an entry with
/// neither is always kept.
pub fn deduplicate(entries: Vec<Entry>) -> Vec<Entry> {
    let input_len = entries.len();
    let mut seen_links: HashSet<String> = HashSet::new();
    let mut seen_titles: HashSet<String> = HashSet::new();
    let mut unique = Vec::with_capacity(input_len);

    for entry in entries {
        let link = entry.link.trim();
        if !link.is_empty() && seen_links.contains(link) {
            continue;
        }

        let title = entry.title.to_lowercase();
        let title = title.trim();
        let fingerprint = if title.is_empty() {
            None
        } else {
            Some(title_fingerprint(title))
        };
        if let Some(fp) = &fingerprint {
            if seen_titles.contains(fp) {
                continue;
            }
        }

        if !link.is_empty() {
            seen_links.insert(link.to_string());
        }
        if let Some(fp) = fingerprint {
            seen_titles.insert(fp);
        }
        unique.push(entry);
    }

    tracing::debug!(
        input = input_len,
        kept = unique.len(),
        dropped = input_len - unique.len(),
        "Deduplicated entries"
    );
    unique
}

fn title_fingerprint(normalized_title: &str) -> String {
    format!("{:x}", Sha256::digest(normalized_title.as_bytes()))
}
