use std::cmp::Reverse;

use super::Entry;

/// Orders entries newest first by [`Entry::effective_timestamp`].
///
/// The sort is stable: entries with equal timestamps keep their input order.
pub fn sort_by_published_descending(mut entries: Vec<Entry>) -> Vec<Entry> {
    entries.sort_by_key(|e| Reverse(e.effective_timestamp()));
    tracing::debug!(entries = entries.len(), "Sorted entries");
    entries
}
