//! The credential record stored inside a vault.
//!
//! An `Entry` carries an opaque identity (`id`) generated once at
//! construction. Equality and hashing go by `id` alone — two entries
//! with identical fields but different ids are distinct records.

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{CredVaultError, Result};

use super::tags::normalize_tag;

/// A single credential record.
///
/// Invariants: `service`, `username`, and `password` are non-empty after
/// trimming; `tags` holds only normalized (trimmed, lower-cased) strings;
/// `updated_at >= created_at`, clamped at construction and on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Opaque unique identity, generated once, never reused.
    pub id: String,

    /// The service this credential belongs to (e.g. "Gmail").
    pub service: String,

    /// The account name or login.
    pub username: String,

    /// The secret itself.
    pub password: String,

    /// Optional free-form note.
    #[serde(default)]
    pub note: Option<String>,

    /// Normalized tags, kept sorted for deterministic serialization.
    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// When this entry was first created.
    pub created_at: DateTime<Utc>,

    /// When this entry was last modified. Never earlier than `created_at`.
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Create a new entry with a fresh id and current timestamps.
    pub fn new(service: &str, username: &str, password: &str, note: Option<&str>) -> Result<Self> {
        let now = Utc::now();
        let entry = Self {
            id: Uuid::new_v4().to_string(),
            service: service.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            note: note.map(str::to_string),
            tags: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Check the non-empty field invariants.
    pub fn validate(&self) -> Result<()> {
        if self.service.trim().is_empty() {
            return Err(CredVaultError::InvalidEntry("service cannot be empty".into()));
        }
        if self.username.trim().is_empty() {
            return Err(CredVaultError::InvalidEntry("username cannot be empty".into()));
        }
        if self.password.trim().is_empty() {
            return Err(CredVaultError::InvalidEntry("password cannot be empty".into()));
        }
        Ok(())
    }

    /// Bump `updated_at` to now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Restore invariants on a record deserialized from disk.
    ///
    /// Clamps `updated_at` to `created_at`, re-normalizes the tag set,
    /// and re-validates the field invariants.
    pub(crate) fn normalize_loaded(&mut self) -> Result<()> {
        if self.updated_at < self.created_at {
            self.updated_at = self.created_at;
        }
        self.tags = std::mem::take(&mut self.tags)
            .iter()
            .filter_map(|t| normalize_tag(t))
            .collect();
        self.validate()
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Entry {}

impl Hash for Entry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A field-wise patch applied by `VaultStore::edit`.
///
/// `None` leaves a field untouched. For the note, `Some(None)` clears it
/// and `Some(Some(text))` replaces it.
#[derive(Debug, Clone, Default)]
pub struct EntryUpdate {
    pub service: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub note: Option<Option<String>>,
}

impl EntryUpdate {
    /// Returns `true` if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.service.is_none()
            && self.username.is_none()
            && self.password.is_none()
            && self.note.is_none()
    }
}
