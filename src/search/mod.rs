//! Stateless filtering and sorting over a snapshot of entries.
//!
//! A query matches when three independent predicates all hold: the
//! per-field filters, the free-text filter, and the tag filter. Text
//! matching supports glob-style `*` / `?` wildcards translated into an
//! anchored regex; patterns without wildcards fall back to substring
//! containment.

use regex::Regex;

use crate::model::tags::matches_tags;
use crate::model::{Entry, SearchQuery, SortKey};

/// Filter `entries` by `query`, sort by the requested key and direction,
/// and truncate to the requested limit.
///
/// An empty query skips filtering entirely and returns all entries
/// sorted (browse-all).
pub fn search(entries: &[Entry], query: &SearchQuery) -> Vec<Entry> {
    let mut results: Vec<Entry> = if query.is_empty() {
        entries.to_vec()
    } else {
        entries
            .iter()
            .filter(|entry| matches(entry, query))
            .cloned()
            .collect()
    };

    sort_entries(&mut results, query);

    if let Some(limit) = query.limit {
        results.truncate(limit);
    }
    results
}

/// Returns `true` when `entry` satisfies every predicate of `query`.
pub fn matches(entry: &Entry, query: &SearchQuery) -> bool {
    matches_field_filters(entry, query)
        && matches_text_filter(entry, query)
        && matches_tag_filter(entry, query)
}

fn matches_field_filters(entry: &Entry, query: &SearchQuery) -> bool {
    matches_field(&query.service, Some(&entry.service), query.case_sensitive)
        && matches_field(&query.username, Some(&entry.username), query.case_sensitive)
        && matches_field(&query.note, entry.note.as_deref(), query.case_sensitive)
}

/// One field filter: unset matches everything; set but the entry field
/// absent never matches; otherwise the text-match rule applies.
fn matches_field(filter: &Option<String>, value: Option<&str>, case_sensitive: bool) -> bool {
    let Some(filter) = filter.as_deref().filter(|f| !f.is_empty()) else {
        return true;
    };
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return false;
    };
    text_matches(filter, value, case_sensitive)
}

fn matches_text_filter(entry: &Entry, query: &SearchQuery) -> bool {
    let Some(search_text) = query.search_text.as_deref().filter(|s| !s.is_empty()) else {
        return true;
    };
    let haystack = format!(
        "{} {} {}",
        entry.service,
        entry.username,
        entry.note.as_deref().unwrap_or("")
    );
    text_matches(search_text, &haystack, query.case_sensitive)
}

fn matches_tag_filter(entry: &Entry, query: &SearchQuery) -> bool {
    match query.tags.as_deref() {
        Some(tags) => matches_tags(entry, tags, query.match_all_tags),
        None => true,
    }
}

/// The text-match rule: case-insensitive unless requested otherwise,
/// wildcards trigger anchored pattern matching, plain text is substring
/// containment.
fn text_matches(pattern: &str, text: &str, case_sensitive: bool) -> bool {
    if pattern.is_empty() || text.is_empty() {
        return false;
    }

    let (pattern, text) = if case_sensitive {
        (pattern.to_string(), text.to_string())
    } else {
        (pattern.to_lowercase(), text.to_lowercase())
    };

    if pattern.contains('*') || pattern.contains('?') {
        wildcard_match(&pattern, &text)
    } else {
        text.contains(&pattern)
    }
}

/// Translate a glob pattern into an anchored full-string regex match.
///
/// `*` becomes `.*`, `?` becomes `.`, everything else is escaped. If the
/// translated pattern fails to compile, degrade to a plain substring
/// match with the wildcard characters stripped rather than erroring.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let mut translated = String::with_capacity(pattern.len() + 2);
    translated.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => translated.push_str(".*"),
            '?' => translated.push('.'),
            _ => translated.push_str(&regex::escape(&ch.to_string())),
        }
    }
    translated.push('$');

    match Regex::new(&translated) {
        Ok(re) => re.is_match(text),
        Err(_) => {
            let stripped: String = pattern.chars().filter(|c| !matches!(c, '*' | '?')).collect();
            text.contains(&stripped)
        }
    }
}

/// Stable sort by the query's key, honoring the direction flag.
fn sort_entries(entries: &mut [Entry], query: &SearchQuery) {
    entries.sort_by(|a, b| {
        let ordering = match query.sort_by {
            SortKey::Service => a.service.cmp(&b.service),
            SortKey::Username => a.username.cmp(&b.username),
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        };
        if query.sort_descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

/// Group entries that share a case-insensitive (service, username) pair.
///
/// Returns only groups with more than one member. Useful for surfacing
/// accounts stored twice under slightly different casing.
pub fn find_duplicates(entries: &[Entry]) -> Vec<Vec<Entry>> {
    use std::collections::BTreeMap;

    let mut groups: BTreeMap<(String, String), Vec<Entry>> = BTreeMap::new();
    for entry in entries {
        let key = (entry.service.to_lowercase(), entry.username.to_lowercase());
        groups.entry(key).or_default().push(entry.clone());
    }

    groups
        .into_values()
        .filter(|group| group.len() > 1)
        .collect()
}
