//! Integration tests for the entry model and tag overlay.

use std::collections::HashSet;

use credvault::model::{normalize_tag, Entry};

fn sample_entry() -> Entry {
    Entry::new("Gmail", "user@gmail.com", "hunter22", Some("personal email")).expect("valid entry")
}

// ---------------------------------------------------------------------------
// Construction and validation
// ---------------------------------------------------------------------------

#[test]
fn new_entry_has_fresh_identity_and_timestamps() {
    let entry = sample_entry();

    assert!(!entry.id.is_empty());
    assert_eq!(entry.created_at, entry.updated_at);
    assert!(entry.tags.is_empty());
}

#[test]
fn blank_fields_are_rejected() {
    assert!(Entry::new("", "user", "pw", None).is_err());
    assert!(Entry::new("   ", "user", "pw", None).is_err());
    assert!(Entry::new("svc", "", "pw", None).is_err());
    assert!(Entry::new("svc", "user", "  ", None).is_err());
}

#[test]
fn identity_defines_equality_not_field_contents() {
    let a = Entry::new("Gmail", "user", "pw", None).expect("entry a");
    let b = Entry::new("Gmail", "user", "pw", None).expect("entry b");

    // Identical fields, distinct ids: distinct records.
    assert_ne!(a, b);

    // A clone shares the id and compares equal even after field edits.
    let mut c = a.clone();
    c.service = "Other".to_string();
    assert_eq!(a, c);

    let set: HashSet<Entry> = [a.clone(), b, c].into_iter().collect();
    assert_eq!(set.len(), 2, "hashing must follow id equality");
}

// ---------------------------------------------------------------------------
// Tag overlay
// ---------------------------------------------------------------------------

#[test]
fn add_tag_normalizes_and_is_idempotent() {
    let mut entry = sample_entry();

    assert!(entry.add_tag("Work"));
    assert!(!entry.add_tag("  work  "), "same tag after normalization");

    assert_eq!(entry.tags.len(), 1);
    assert!(entry.tags.contains("work"));
}

#[test]
fn blank_tags_are_rejected() {
    let mut entry = sample_entry();

    assert!(!entry.add_tag(""));
    assert!(!entry.add_tag("   "));
    assert!(entry.tags.is_empty());
}

#[test]
fn add_tag_bumps_updated_at_only_on_change() {
    let mut entry = sample_entry();
    let before = entry.updated_at;

    assert!(entry.add_tag("work"));
    let after_insert = entry.updated_at;
    assert!(after_insert >= before);

    // A no-op insert must not touch the timestamp.
    assert!(!entry.add_tag("work"));
    assert_eq!(entry.updated_at, after_insert);
}

#[test]
fn remove_missing_tag_returns_false_without_mutation() {
    let mut entry = sample_entry();
    entry.add_tag("work");
    let stamp = entry.updated_at;

    assert!(!entry.remove_tag("missing"));
    assert_eq!(entry.updated_at, stamp);
    assert_eq!(entry.tags.len(), 1);

    assert!(entry.remove_tag("WORK"));
    assert!(entry.tags.is_empty());
}

#[test]
fn membership_predicates() {
    let mut entry = sample_entry();
    entry.add_tag("work");
    entry.add_tag("email");

    assert!(entry.has_tag("Work"));
    assert!(!entry.has_tag("personal"));

    assert!(entry.has_any_tag(&["personal".into(), "email".into()]));
    assert!(!entry.has_any_tag(&["personal".into()]));
    assert!(!entry.has_any_tag(&[]));

    assert!(entry.has_all_tags(&["WORK".into(), "email".into()]));
    assert!(!entry.has_all_tags(&["work".into(), "missing".into()]));
    assert!(!entry.has_all_tags(&[]));
}

#[test]
fn blank_tags_in_a_filter_never_match() {
    let mut entry = sample_entry();
    entry.add_tag("work");

    // A blank tag can never be present on an entry, so it must not be
    // silently dropped from an ALL-mode filter.
    assert!(!entry.has_all_tags(&["   ".into()]));
    assert!(!entry.has_all_tags(&["work".into(), "   ".into()]));
    assert!(!entry.has_any_tag(&["   ".into()]));
}

#[test]
fn normalize_tag_trims_and_lowercases() {
    assert_eq!(normalize_tag("  Work "), Some("work".to_string()));
    assert_eq!(normalize_tag("DEV"), Some("dev".to_string()));
    assert_eq!(normalize_tag("  "), None);
}
