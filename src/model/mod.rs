//! Data model — credential records and search filters.
//!
//! This module provides:
//! - `Entry` and `EntryUpdate` types (`entry`)
//! - `SearchQuery` and `SortKey` filter specifications (`query`)
//! - Tag normalization and membership helpers (`tags`)

pub mod entry;
pub mod query;
pub mod tags;

// Re-export the most commonly used items.
pub use entry::{Entry, EntryUpdate};
pub use query::{SearchQuery, SortKey};
pub use tags::{matches_tags, normalize_tag};
