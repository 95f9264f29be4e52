//! High-level vault operations.
//!
//! `VaultStore` owns the authoritative in-memory entry collection and
//! wraps the envelope layer and the crypto layer, so callers work with
//! simple method calls like `store.add(entry)` or `store.search(&query)`.
//!
//! Every mutation persists the entire collection synchronously before
//! returning, so within one process no read ever observes a state
//! between "applied in memory" and "durable on disk". If persistence
//! fails after the in-memory mutation, the store marks itself unusable
//! and every later mutation fails with `StoreUnusable`; the on-disk file
//! is still the previous valid content thanks to the atomic rename.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use zeroize::Zeroize;

use crate::crypto::cipher::VaultCipher;
use crate::crypto::kdf::{generate_salt, Pbkdf2Params};
use crate::errors::{CredVaultError, Result};
use crate::model::{Entry, EntryUpdate, SearchQuery};
use crate::search;

use super::format::{self, RawVault, StoredKdfParams, VaultHeader, CURRENT_VERSION};

/// The main vault handle. Create one with `VaultStore::open`, then use
/// its methods to manage entries.
pub struct VaultStore {
    /// Path to the `.vault` file on disk.
    path: PathBuf,

    /// Header metadata (version, salt, KDF params, creation time).
    header: VaultHeader,

    /// The keyed cipher (keys zeroized on drop).
    cipher: VaultCipher,

    /// The authoritative entry collection, in insertion order.
    entries: Vec<Entry>,

    /// Set when a save failed after an in-memory mutation; memory and
    /// disk have diverged and this store must not be trusted further.
    poisoned: bool,
}

impl VaultStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Open the vault at `path` with the given master password.
    ///
    /// If the file exists its salt and KDF parameters are read from the
    /// header, the keys re-derived, and the entry collection decrypted
    /// and verified; `kdf_params` is ignored. If the file does not exist
    /// (or is empty) the store starts with an empty collection and a
    /// fresh random salt — the file is only created by the first save.
    ///
    /// Any decryption-family failure here means tampering or a wrong
    /// master password; no partial plaintext is ever returned.
    pub fn open(
        path: &Path,
        master_password: &[u8],
        kdf_params: Option<&Pbkdf2Params>,
    ) -> Result<Self> {
        match format::read_vault(path)? {
            Some(raw) => Self::open_existing(path, master_password, raw),
            None => Self::open_fresh(path, master_password, kdf_params),
        }
    }

    fn open_existing(path: &Path, master_password: &[u8], raw: RawVault) -> Result<Self> {
        let salt = raw.header.salt_array()?;
        let params = Pbkdf2Params {
            cipher_iterations: raw.header.kdf.cipher_iterations,
            mac_iterations: raw.header.kdf.mac_iterations,
        };

        let cipher = VaultCipher::new(master_password, salt, params)?;
        let entries = Self::decode_entries(&cipher, &raw.token)?;

        Ok(Self {
            path: path.to_path_buf(),
            header: raw.header,
            cipher,
            entries,
            poisoned: false,
        })
    }

    fn open_fresh(
        path: &Path,
        master_password: &[u8],
        kdf_params: Option<&Pbkdf2Params>,
    ) -> Result<Self> {
        let salt = generate_salt();
        let params = kdf_params.copied().unwrap_or_default();
        let cipher = VaultCipher::new(master_password, salt, params)?;

        let header = VaultHeader {
            version: CURRENT_VERSION,
            salt: salt.to_vec(),
            created_at: Utc::now(),
            kdf: StoredKdfParams {
                cipher_iterations: params.cipher_iterations,
                mac_iterations: params.mac_iterations,
            },
        };

        Ok(Self {
            path: path.to_path_buf(),
            header,
            cipher,
            entries: Vec::new(),
            poisoned: false,
        })
    }

    /// Decrypt and deserialize the entry collection, restoring every
    /// record's invariants.
    ///
    /// Fail-closed: a single record that fails to parse or validate
    /// aborts the whole load.
    fn decode_entries(cipher: &VaultCipher, token: &[u8]) -> Result<Vec<Entry>> {
        let mut plaintext = cipher.decrypt(token)?;

        let result = serde_json::from_slice::<Vec<Entry>>(&plaintext)
            .map_err(|e| CredVaultError::InvalidVaultFormat(format!("entries JSON: {e}")));
        plaintext.zeroize();

        let mut entries = result?;
        for entry in &mut entries {
            entry.normalize_loaded().map_err(|e| {
                CredVaultError::InvalidVaultFormat(format!("corrupt entry record: {e}"))
            })?;
        }
        Ok(entries)
    }

    // ------------------------------------------------------------------
    // Entry operations
    // ------------------------------------------------------------------

    /// Append a new entry and persist.
    ///
    /// Rejects an entry whose id is already present — ids are generated
    /// once and never reused.
    pub fn add(&mut self, entry: Entry) -> Result<()> {
        self.ensure_usable()?;
        entry.validate()?;
        if self.entries.iter().any(|e| e.id == entry.id) {
            return Err(CredVaultError::InvalidEntry(format!(
                "duplicate entry id {}",
                entry.id
            )));
        }

        self.entries.push(entry);
        self.save()
    }

    /// A snapshot copy of the current collection, in insertion order.
    pub fn get_all(&self) -> Vec<Entry> {
        self.entries.clone()
    }

    /// Look up an entry by identity. Returns a copy.
    pub fn get_by_id(&self, id: &str) -> Option<Entry> {
        self.entries.iter().find(|e| e.id == id).cloned()
    }

    /// Filter and sort a snapshot of the collection.
    pub fn search(&self, query: &SearchQuery) -> Vec<Entry> {
        search::search(&self.entries, query)
    }

    /// Add a tag to the entry with the given id, persisting on change.
    ///
    /// Returns `Ok(false)` if the id is unknown or the tag was already
    /// present (after normalization).
    pub fn add_tag(&mut self, id: &str, tag: &str) -> Result<bool> {
        self.ensure_usable()?;
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) else {
            return Ok(false);
        };
        if !entry.add_tag(tag) {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Remove a tag from the entry with the given id, persisting on change.
    ///
    /// Returns `Ok(false)` if the id is unknown or the tag was absent.
    pub fn remove_tag(&mut self, id: &str, tag: &str) -> Result<bool> {
        self.ensure_usable()?;
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) else {
            return Ok(false);
        };
        if !entry.remove_tag(tag) {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Apply field changes to the entry with the given id, bump its
    /// `updated_at`, and persist.
    ///
    /// Returns `Ok(false)` if the id is unknown. Replaced passwords are
    /// wiped from memory.
    pub fn edit(&mut self, id: &str, update: EntryUpdate) -> Result<bool> {
        self.ensure_usable()?;
        if update.is_empty() {
            return Ok(self.entries.iter().any(|e| e.id == id));
        }
        let Some(index) = self.entries.iter().position(|e| e.id == id) else {
            return Ok(false);
        };

        // Validate against a copy so a rejected update leaves the entry
        // untouched.
        let mut updated = self.entries[index].clone();
        if let Some(service) = update.service {
            updated.service = service;
        }
        if let Some(username) = update.username {
            updated.username = username;
        }
        if let Some(password) = update.password {
            updated.password = password;
        }
        if let Some(note) = update.note {
            updated.note = note;
        }
        updated.validate()?;
        updated.touch();

        let mut replaced = std::mem::replace(&mut self.entries[index], updated);
        replaced.password.zeroize();

        self.save()?;
        Ok(true)
    }

    /// Delete the entry with the given id and persist.
    ///
    /// Returns `Ok(false)` if the id is unknown. The removed password is
    /// wiped from memory.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        self.ensure_usable()?;
        let Some(index) = self.entries.iter().position(|e| e.id == id) else {
            return Ok(false);
        };

        let mut removed = self.entries.remove(index);
        removed.password.zeroize();

        self.save()?;
        Ok(true)
    }

    /// Wipe secret-bearing fields and release the collection.
    ///
    /// Best-effort hygiene, not a cryptographic guarantee: entry
    /// passwords are overwritten before the collection is dropped. Also
    /// performed automatically on drop.
    pub fn close(mut self) {
        self.wipe();
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Serialize the collection, encrypt it, and write it atomically.
    ///
    /// On failure the store is poisoned: memory and disk have diverged
    /// and the caller must treat this process instance as done.
    fn save(&mut self) -> Result<()> {
        let result = self.save_inner();
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    fn save_inner(&self) -> Result<()> {
        let mut plaintext = serde_json::to_vec(&self.entries)
            .map_err(|e| CredVaultError::SerializationFailed(format!("entries: {e}")))?;

        let token = self.cipher.encrypt(&plaintext);
        plaintext.zeroize();
        let token = token?;

        format::write_vault(&self.path, &self.header, &token)
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.poisoned {
            return Err(CredVaultError::StoreUnusable);
        }
        Ok(())
    }

    fn wipe(&mut self) {
        for entry in &mut self.entries {
            entry.password.zeroize();
        }
        self.entries.clear();
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the path to the vault file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of entries in the vault.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the vault holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the vault creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.header.created_at
    }

    /// Returns `true` once a save has failed and the store refuses
    /// further mutations.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}

impl Drop for VaultStore {
    fn drop(&mut self) {
        self.wipe();
    }
}
