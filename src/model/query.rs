//! Immutable search filter specification.

/// Sort key for search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Service,
    Username,
    CreatedAt,
    UpdatedAt,
}

/// A filter specification consumed by the search engine.
///
/// Every filter field is optional; a query where all of them are
/// unset/empty is "empty" and matches every entry (browse-all).
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Per-field filters. Unset matches everything; set but the entry
    /// field is absent never matches.
    pub service: Option<String>,
    pub username: Option<String>,
    pub note: Option<String>,

    /// Tag filter; mode is controlled by `match_all_tags`.
    pub tags: Option<Vec<String>>,

    /// Cross-field free-text filter over service + username + note.
    pub search_text: Option<String>,

    /// Case-sensitive text matching (default: insensitive).
    pub case_sensitive: bool,

    /// ALL-mode tag matching (default: ANY-mode).
    pub match_all_tags: bool,

    /// Truncate results to at most this many entries.
    pub limit: Option<usize>,

    /// Sort key (default: service).
    pub sort_by: SortKey,

    /// Sort direction (default: ascending).
    pub sort_descending: bool,
}

impl SearchQuery {
    /// A free-text query over all textual fields.
    pub fn for_text(search_text: impl Into<String>) -> Self {
        Self {
            search_text: Some(search_text.into()),
            ..Self::default()
        }
    }

    /// A query filtering on the service field.
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            service: Some(service.into()),
            ..Self::default()
        }
    }

    /// A query filtering on tags.
    pub fn for_tags(tags: Vec<String>, match_all: bool) -> Self {
        Self {
            tags: Some(tags),
            match_all_tags: match_all,
            ..Self::default()
        }
    }

    /// Returns `true` when no filter field is set — such a query matches
    /// and returns all entries, sorted.
    pub fn is_empty(&self) -> bool {
        fn unset(value: &Option<String>) -> bool {
            value.as_deref().map_or(true, str::is_empty)
        }

        unset(&self.service)
            && unset(&self.username)
            && unset(&self.note)
            && unset(&self.search_text)
            && self.tags.as_deref().map_or(true, <[String]>::is_empty)
    }
}
