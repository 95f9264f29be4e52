//! Integration tests for the CredVault vault store.

use std::fs;

use chrono::Utc;
use credvault::crypto::{generate_salt, Pbkdf2Params, VaultCipher};
use credvault::errors::CredVaultError;
use credvault::model::{Entry, EntryUpdate, SearchQuery};
use credvault::vault::format::{write_vault, StoredKdfParams, VaultHeader, CURRENT_VERSION};
use credvault::vault::VaultStore;
use tempfile::TempDir;

/// Fast KDF parameters for tests — production vaults use the defaults.
const TEST_PARAMS: Pbkdf2Params = Pbkdf2Params {
    cipher_iterations: 2_000,
    mac_iterations: 1_000,
};

/// Helper: create a temporary vault file path inside a fresh temp dir.
fn vault_path() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("test.vault");
    (dir, path)
}

fn open(path: &std::path::Path, password: &[u8]) -> credvault::errors::Result<VaultStore> {
    VaultStore::open(path, password, Some(&TEST_PARAMS))
}

fn entry(service: &str, username: &str) -> Entry {
    Entry::new(service, username, "s3cret-pw", None).expect("valid entry")
}

/// Helper: write a vault file whose decrypted payload is `entries_json`,
/// bypassing the store so load-time handling of stored records can be
/// exercised directly.
fn write_raw_vault(path: &std::path::Path, password: &[u8], entries_json: &str) {
    let salt = generate_salt();
    let cipher = VaultCipher::new(password, salt, TEST_PARAMS).expect("build cipher");
    let token = cipher.encrypt(entries_json.as_bytes()).expect("encrypt");

    let header = VaultHeader {
        version: CURRENT_VERSION,
        salt: salt.to_vec(),
        created_at: Utc::now(),
        kdf: StoredKdfParams {
            cipher_iterations: TEST_PARAMS.cipher_iterations,
            mac_iterations: TEST_PARAMS.mac_iterations,
        },
    };
    write_vault(path, &header, &token).expect("write vault");
}

// ---------------------------------------------------------------------------
// Fresh vault and first save
// ---------------------------------------------------------------------------

#[test]
fn fresh_vault_is_empty_and_not_yet_on_disk() {
    let (_dir, path) = vault_path();

    let store = open(&path, b"fresh-pw").expect("open fresh vault");
    assert!(store.is_empty());
    assert!(!path.exists(), "file is only created by the first save");
}

#[test]
fn first_add_creates_the_file() {
    let (_dir, path) = vault_path();

    let mut store = open(&path, b"add-pw").unwrap();
    store.add(entry("Gmail", "alice")).expect("add entry");

    assert!(path.exists());
    assert_eq!(store.len(), 1);
}

#[test]
fn empty_file_opens_as_empty_vault() {
    let (_dir, path) = vault_path();
    fs::write(&path, b"").unwrap();

    let store = open(&path, b"any-pw").expect("open empty file");
    assert!(store.is_empty());
}

// ---------------------------------------------------------------------------
// Round trip
// ---------------------------------------------------------------------------

#[test]
fn reopen_yields_identical_entries_in_order() {
    let (_dir, path) = vault_path();

    let originals = vec![
        entry("Gmail", "alice"),
        entry("GitHub", "alice-dev"),
        entry("Amazon", "alice"),
    ];

    {
        let mut store = open(&path, b"roundtrip-pw").unwrap();
        for e in &originals {
            store.add(e.clone()).expect("add");
        }
        store.close();
    }

    let store = open(&path, b"roundtrip-pw").expect("reopen vault");
    let loaded = store.get_all();

    assert_eq!(loaded, originals, "identity equality, insertion order");
    for (loaded, original) in loaded.iter().zip(&originals) {
        assert_eq!(loaded.service, original.service);
        assert_eq!(loaded.username, original.username);
        assert_eq!(loaded.password, original.password);
        assert_eq!(loaded.created_at, original.created_at);
        assert_eq!(loaded.updated_at, original.updated_at);
    }
}

#[test]
fn tags_survive_a_reopen() {
    let (_dir, path) = vault_path();

    let e = entry("Gmail", "alice");
    let id = e.id.clone();

    {
        let mut store = open(&path, b"tag-pw").unwrap();
        store.add(e).unwrap();
        assert!(store.add_tag(&id, "Work").unwrap());
        assert!(!store.add_tag(&id, "work").unwrap(), "idempotent");
        assert!(!store.add_tag("no-such-id", "work").unwrap());
    }

    let store = open(&path, b"tag-pw").unwrap();
    let loaded = store.get_by_id(&id).expect("entry survives");
    assert!(loaded.has_tag("work"));
    assert_eq!(loaded.tags.len(), 1);
}

// ---------------------------------------------------------------------------
// Authentication and tampering
// ---------------------------------------------------------------------------

#[test]
fn wrong_password_fails_before_exposing_entries() {
    let (_dir, path) = vault_path();

    {
        let mut store = open(&path, b"correct-password").unwrap();
        store.add(entry("Gmail", "alice")).unwrap();
    }

    let err = match open(&path, b"wrong-password") {
        Ok(_) => panic!("wrong password must fail to open the vault"),
        Err(e) => e,
    };
    assert!(
        err.is_authentication_failure(),
        "expected an authentication-family failure, got {err:?}"
    );
}

#[test]
fn tampered_token_is_detected() {
    let (_dir, path) = vault_path();

    {
        let mut store = open(&path, b"tamper-pw").unwrap();
        store.add(entry("Gmail", "alice")).unwrap();
    }

    // Flip the last byte — always inside the encrypted token.
    let mut data = fs::read(&path).unwrap();
    let last = data.len() - 1;
    data[last] ^= 0xFF;
    fs::write(&path, &data).unwrap();

    let err = match open(&path, b"tamper-pw") {
        Ok(_) => panic!("tampered vault must be rejected"),
        Err(e) => e,
    };
    assert!(err.is_authentication_failure());
}

#[test]
fn tampered_header_is_detected() {
    let (_dir, path) = vault_path();

    {
        let mut store = open(&path, b"header-pw").unwrap();
        store.add(entry("Gmail", "alice")).unwrap();
    }

    // Flip a byte inside the header JSON (salt region); the derived keys
    // change, so the MAC no longer verifies.
    let mut data = fs::read(&path).unwrap();
    data[40] ^= 0x01;
    fs::write(&path, &data).unwrap();

    assert!(open(&path, b"header-pw").is_err());
}

#[test]
fn corrupt_record_aborts_the_whole_load() {
    let (_dir, path) = vault_path();

    // A record with an empty service violates the entry invariants.
    let records = r#"[{"id":"a1","service":"","username":"alice","password":"pw","note":null,"tags":[],"created_at":"2024-06-01T12:00:00Z","updated_at":"2024-06-01T12:00:00Z"}]"#;
    write_raw_vault(&path, b"closed-pw", records);

    // Fail-closed: one bad record rejects the whole vault.
    let result = open(&path, b"closed-pw");
    assert!(matches!(
        result,
        Err(CredVaultError::InvalidVaultFormat(_))
    ));
}

#[test]
fn updated_at_is_clamped_and_tags_renormalized_on_load() {
    let (_dir, path) = vault_path();

    // updated_at earlier than created_at, tags stored un-normalized.
    let records = r#"[{"id":"a2","service":"Gmail","username":"alice","password":"pw","note":null,"tags":["  Work "],"created_at":"2024-06-01T12:00:00Z","updated_at":"2023-01-01T00:00:00Z"}]"#;
    write_raw_vault(&path, b"clamp-pw", records);

    let store = open(&path, b"clamp-pw").expect("open vault");
    let loaded = store.get_by_id("a2").expect("entry survives the load");

    assert_eq!(loaded.updated_at, loaded.created_at);
    assert!(loaded.has_tag("work"));
    assert_eq!(loaded.tags.len(), 1);
}

#[test]
fn garbage_file_fails_as_invalid_format() {
    let (_dir, path) = vault_path();
    fs::write(&path, b"not a vault at all").unwrap();

    let result = open(&path, b"pw");
    assert!(matches!(
        result,
        Err(CredVaultError::InvalidVaultFormat(_))
    ));
}

// ---------------------------------------------------------------------------
// Atomicity and divergence
// ---------------------------------------------------------------------------

#[test]
fn failed_save_leaves_previous_file_intact_and_poisons_the_store() {
    let (_dir, path) = vault_path();

    let first = entry("Gmail", "alice");
    let first_id = first.id.clone();

    let mut store = open(&path, b"atomic-pw").unwrap();
    store.add(first).unwrap();

    // Block the temp-file path with a directory so the next save fails
    // before the rename.
    let tmp_path = path.parent().unwrap().join(".test.vault.tmp");
    fs::create_dir(&tmp_path).unwrap();

    let result = store.add(entry("GitHub", "alice-dev"));
    assert!(result.is_err(), "save through a blocked temp path must fail");
    assert!(store.is_poisoned());

    // Further mutations are refused.
    let result = store.add(entry("Amazon", "alice"));
    assert!(matches!(result, Err(CredVaultError::StoreUnusable)));
    drop(store);

    // The previously persisted file is fully intact and loadable.
    fs::remove_dir(&tmp_path).unwrap();
    let store = open(&path, b"atomic-pw").expect("previous vault still valid");
    assert_eq!(store.len(), 1);
    assert!(store.get_by_id(&first_id).is_some());
}

// ---------------------------------------------------------------------------
// Mutation operations
// ---------------------------------------------------------------------------

#[test]
fn edit_updates_fields_and_bumps_updated_at() {
    let (_dir, path) = vault_path();

    let e = Entry::new("Gmail", "alice", "old-pw", Some("note")).unwrap();
    let id = e.id.clone();
    let created = e.created_at;

    let mut store = open(&path, b"edit-pw").unwrap();
    store.add(e).unwrap();

    let update = EntryUpdate {
        password: Some("new-pw".into()),
        note: Some(None),
        ..EntryUpdate::default()
    };
    assert!(store.edit(&id, update).unwrap());

    let edited = store.get_by_id(&id).unwrap();
    assert_eq!(edited.password, "new-pw");
    assert_eq!(edited.note, None);
    assert_eq!(edited.created_at, created);
    assert!(edited.updated_at >= created);

    // Unknown ids report false, invalid updates are rejected untouched.
    assert!(!store.edit("no-such-id", EntryUpdate::default()).unwrap());
    let bad = EntryUpdate {
        service: Some("  ".into()),
        ..EntryUpdate::default()
    };
    assert!(store.edit(&id, bad).is_err());
    assert_eq!(store.get_by_id(&id).unwrap().password, "new-pw");
}

#[test]
fn remove_deletes_the_entry_durably() {
    let (_dir, path) = vault_path();

    let keep = entry("Gmail", "alice");
    let gone = entry("GitHub", "alice-dev");
    let (keep_id, gone_id) = (keep.id.clone(), gone.id.clone());

    {
        let mut store = open(&path, b"remove-pw").unwrap();
        store.add(keep).unwrap();
        store.add(gone).unwrap();

        assert!(store.remove(&gone_id).unwrap());
        assert!(!store.remove(&gone_id).unwrap(), "already gone");
    }

    let store = open(&path, b"remove-pw").unwrap();
    assert_eq!(store.len(), 1);
    assert!(store.get_by_id(&keep_id).is_some());
    assert!(store.get_by_id(&gone_id).is_none());
}

#[test]
fn duplicate_id_is_rejected() {
    let (_dir, path) = vault_path();

    let e = entry("Gmail", "alice");
    let dup = e.clone();

    let mut store = open(&path, b"dup-pw").unwrap();
    store.add(e).unwrap();

    let result = store.add(dup);
    assert!(matches!(result, Err(CredVaultError::InvalidEntry(_))));
    assert_eq!(store.len(), 1);
}

#[test]
fn search_runs_over_a_snapshot() {
    let (_dir, path) = vault_path();

    let mut store = open(&path, b"search-pw").unwrap();
    store.add(entry("Gmail", "alice")).unwrap();
    store.add(entry("GitHub", "alice-dev")).unwrap();
    store.add(entry("Amazon", "alice")).unwrap();

    let results = store.search(&SearchQuery::for_service("g*"));
    assert_eq!(results.len(), 2);

    let all = store.search(&SearchQuery::default());
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].service, "Amazon");
}

// ---------------------------------------------------------------------------
// End-to-end
// ---------------------------------------------------------------------------

#[test]
fn end_to_end_create_populate_close_reopen() {
    let (_dir, path) = vault_path();
    let password = b"correct horse battery staple";

    let originals = vec![
        entry("Gmail", "alice@gmail.com"),
        entry("GitHub", "alice-dev"),
        entry("Amazon", "alice"),
    ];

    {
        let mut store = open(&path, password).unwrap();
        for e in &originals {
            store.add(e.clone()).unwrap();
        }
        store.close();
    }

    // Same password: identical entry set.
    {
        let store = open(&path, password).unwrap();
        assert_eq!(store.get_all(), originals);
        store.close();
    }

    // Wrong password: open fails before any entry is exposed.
    let err = match open(&path, b"not the password") {
        Ok(_) => panic!("wrong password must fail to open the vault"),
        Err(e) => e,
    };
    assert!(err.is_authentication_failure());
}
