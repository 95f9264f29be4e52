//! Tag normalization and set-membership helpers.
//!
//! Tags are stored trimmed and lower-cased, so `"Work"`, `" work "`, and
//! `"work"` are the same tag. Mutating helpers report whether a change
//! happened and only then bump `updated_at`.

use super::entry::Entry;

/// Normalize a raw tag: trim and lower-case.
///
/// Returns `None` for blank or whitespace-only input.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

impl Entry {
    /// Add a tag to this entry. Returns `false` (no-op) if the tag is
    /// blank or already present; otherwise inserts it and bumps
    /// `updated_at`.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let Some(tag) = normalize_tag(tag) else {
            return false;
        };
        if self.tags.insert(tag) {
            self.touch();
            true
        } else {
            false
        }
    }

    /// Remove a tag from this entry. Returns `false` if it was absent.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let Some(tag) = normalize_tag(tag) else {
            return false;
        };
        if self.tags.remove(&tag) {
            self.touch();
            true
        } else {
            false
        }
    }

    /// Returns `true` if this entry carries the (normalized) tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        match normalize_tag(tag) {
            Some(tag) => self.tags.contains(&tag),
            None => false,
        }
    }

    /// Returns `true` if this entry carries at least one of `tags`.
    /// An empty list matches nothing.
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        tags.iter()
            .filter_map(|t| normalize_tag(t))
            .any(|t| self.tags.contains(&t))
    }

    /// Returns `true` if this entry carries every one of `tags`.
    /// An empty list matches nothing, and so does a blank tag — it can
    /// never be present on an entry.
    pub fn has_all_tags(&self, tags: &[String]) -> bool {
        if tags.is_empty() {
            return false;
        }
        tags.iter().all(|t| match normalize_tag(t) {
            Some(t) => self.tags.contains(&t),
            None => false,
        })
    }
}

/// Tag predicate used by the query engine.
///
/// An empty filter matches every entry; otherwise ANY-mode requires a
/// non-empty intersection and ALL-mode requires a subset.
pub fn matches_tags(entry: &Entry, tags: &[String], match_all: bool) -> bool {
    if tags.is_empty() {
        return true;
    }
    if match_all {
        entry.has_all_tags(tags)
    } else {
        entry.has_any_tag(tags)
    }
}
