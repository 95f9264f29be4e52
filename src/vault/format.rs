//! Binary vault envelope and atomic file persistence.
//!
//! A `.vault` file has this layout:
//!
//! ```text
//! [CVLT: 4 bytes][version: 1 byte][header_len: 4 bytes LE][header JSON][token]
//! ```
//!
//! - **Magic** (`CVLT`): identifies the file as a CredVault vault.
//! - **Version**: envelope format version (currently `1`).
//! - **Header length**: little-endian u32 telling us where the header
//!   JSON ends and the encrypted token begins.
//! - **Header JSON**: serialized `VaultHeader` (salt, KDF params).
//! - **Token**: the authenticated-encrypted entry collection, opaque to
//!   this layer. Its own integrity protection lives inside the token;
//!   tampering with the header changes the derived keys and surfaces as
//!   an integrity failure too.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::kdf::SALT_LEN;
use crate::errors::{CredVaultError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every vault file.
const MAGIC: &[u8; 4] = b"CVLT";

/// Current envelope format version.
pub const CURRENT_VERSION: u8 = 1;

/// Fixed-size prefix: 4 (magic) + 1 (version) + 4 (header_len).
const PREFIX_LEN: usize = 9;

// ---------------------------------------------------------------------------
// VaultHeader
// ---------------------------------------------------------------------------

/// PBKDF2 iteration counts stored in the vault header so the exact same
/// KDF settings are used when re-opening.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StoredKdfParams {
    pub cipher_iterations: u32,
    pub mac_iterations: u32,
}

impl Default for StoredKdfParams {
    fn default() -> Self {
        Self {
            cipher_iterations: 600_000,
            mac_iterations: 100_000,
        }
    }
}

/// Metadata stored at the beginning of a vault file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultHeader {
    /// Envelope format version.
    pub version: u8,

    /// The salt used for key derivation (base64 in JSON).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    /// When this vault was first created.
    pub created_at: DateTime<Utc>,

    /// KDF params used at vault creation (stored so open uses the same).
    #[serde(default)]
    pub kdf: StoredKdfParams,
}

impl VaultHeader {
    /// Extract the fixed-length salt, rejecting malformed headers.
    pub fn salt_array(&self) -> Result<[u8; SALT_LEN]> {
        self.salt.as_slice().try_into().map_err(|_| {
            CredVaultError::InvalidVaultFormat(format!(
                "salt must be {SALT_LEN} bytes, got {}",
                self.salt.len()
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Raw data read from a vault file on disk.
pub struct RawVault {
    pub header: VaultHeader,
    /// The authenticated-encrypted token, exactly as stored.
    pub token: Vec<u8>,
}

/// Write a vault file to disk **atomically**.
///
/// 1. Serialize the header to JSON and build the binary envelope.
/// 2. Create the containing directory with owner-only access if absent.
/// 3. Write to a temp file in the same directory.
/// 4. Rename the temp file over the target path.
///
/// The rename ensures readers never see a half-written file; the temp
/// file is removed on every failure path.
pub fn write_vault(path: &Path, header: &VaultHeader, token: &[u8]) -> Result<()> {
    let header_bytes = serde_json::to_vec(header)
        .map_err(|e| CredVaultError::SerializationFailed(format!("header: {e}")))?;

    let header_len = u32::try_from(header_bytes.len()).map_err(|_| {
        CredVaultError::SerializationFailed(format!(
            "header length {} exceeds u32::MAX",
            header_bytes.len()
        ))
    })?;

    let mut buf = Vec::with_capacity(PREFIX_LEN + header_bytes.len() + token.len());
    buf.extend_from_slice(MAGIC); // 4 bytes
    buf.push(CURRENT_VERSION); // 1 byte
    buf.extend_from_slice(&header_len.to_le_bytes()); // 4 bytes LE
    buf.extend_from_slice(&header_bytes); // header JSON
    buf.extend_from_slice(token); // encrypted token

    let parent = path.parent().unwrap_or(Path::new("."));
    create_private_dir(parent)?;

    // Atomic write: write to a temp file, then rename. The temp file is
    // in the same directory so rename is guaranteed to be atomic on the
    // same filesystem.
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    if let Err(e) = fs::write(&tmp_path, &buf) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    Ok(())
}

/// Read a vault file from disk.
///
/// Returns `Ok(None)` when the file does not exist or is empty — a vault
/// that has never been saved. Malformed envelopes fail with
/// `InvalidVaultFormat`.
pub fn read_vault(path: &Path) -> Result<Option<RawVault>> {
    if !path.exists() {
        return Ok(None);
    }

    let data = fs::read(path)?;
    if data.is_empty() {
        return Ok(None);
    }

    if data.len() < PREFIX_LEN {
        return Err(CredVaultError::InvalidVaultFormat(
            "file too small to be a valid vault".into(),
        ));
    }

    // --- Parse the fixed-size prefix ---

    if &data[0..4] != MAGIC {
        return Err(CredVaultError::InvalidVaultFormat(
            "missing CVLT magic bytes".into(),
        ));
    }

    let version = data[4];
    if version != CURRENT_VERSION {
        return Err(CredVaultError::InvalidVaultFormat(format!(
            "unsupported version {version}, expected {CURRENT_VERSION}"
        )));
    }

    let header_len_u32 = u32::from_le_bytes(
        data[5..9]
            .try_into()
            .map_err(|_| CredVaultError::InvalidVaultFormat("bad header length".into()))?,
    );
    let header_len = usize::try_from(header_len_u32).map_err(|_| {
        CredVaultError::InvalidVaultFormat(format!(
            "header length {header_len_u32} exceeds platform address space"
        ))
    })?;

    let header_end = PREFIX_LEN + header_len;
    if header_end > data.len() {
        return Err(CredVaultError::InvalidVaultFormat(
            "header length exceeds file size".into(),
        ));
    }

    let header: VaultHeader = serde_json::from_slice(&data[PREFIX_LEN..header_end])
        .map_err(|e| CredVaultError::InvalidVaultFormat(format!("header JSON: {e}")))?;

    let token = data[header_end..].to_vec();

    Ok(Some(RawVault { header, token }))
}

/// Create `dir` (and its parents) with owner-only access if it is absent.
fn create_private_dir(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() || dir.exists() {
        return Ok(());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)?;
    }
    #[cfg(not(unix))]
    {
        fs::create_dir_all(dir)?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let encoded = BASE64.encode(data);
    serializer.serialize_str(&encoded)
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
