//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! Two independent keys are derived from one master password:
//! - The **encryption key**, from `(password, salt)` with a high
//!   iteration count.
//! - The **MAC key**, from `(password, salt || "hmac")` with a lower
//!   iteration count.
//!
//! The salt suffix domain-separates the two derivations, so the keys
//! stay independent even if one derivation's output were exposed.

use pbkdf2::pbkdf2_hmac;
use rand::TryRngCore;
use sha2::Sha256;

use crate::errors::{CredVaultError, Result};

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Length of each derived key in bytes (256 bits, for AES-256 / HMAC-SHA256).
const KEY_LEN: usize = 32;

/// Suffix appended to the salt for the MAC-key derivation domain.
const MAC_DOMAIN: &[u8] = b"hmac";

/// Minimum iteration count accepted for either derivation.
///
/// A floor against degenerate parameters, not a recommended setting —
/// production vaults use the defaults below.
const MIN_ITERATIONS: u32 = 1_000;

/// Configurable PBKDF2 iteration counts.
///
/// Stored in the vault header at creation so re-opening uses the exact
/// same settings.
#[derive(Debug, Clone, Copy)]
pub struct Pbkdf2Params {
    /// Iterations for the encryption-key derivation (default: 600 000).
    pub cipher_iterations: u32,
    /// Iterations for the MAC-key derivation (default: 100 000).
    pub mac_iterations: u32,
}

impl Default for Pbkdf2Params {
    fn default() -> Self {
        Self {
            cipher_iterations: 600_000,
            mac_iterations: 100_000,
        }
    }
}

/// Derive the 32-byte encryption key and 32-byte MAC key from a master
/// password and salt.
///
/// The same password + salt + params will always produce the same pair.
pub fn derive_keys(
    password: &[u8],
    salt: &[u8],
    params: &Pbkdf2Params,
) -> Result<([u8; KEY_LEN], [u8; KEY_LEN])> {
    if params.cipher_iterations < MIN_ITERATIONS {
        return Err(CredVaultError::KeyDerivationFailed(format!(
            "cipher_iterations must be at least {MIN_ITERATIONS} (got {})",
            params.cipher_iterations
        )));
    }
    if params.mac_iterations < MIN_ITERATIONS {
        return Err(CredVaultError::KeyDerivationFailed(format!(
            "mac_iterations must be at least {MIN_ITERATIONS} (got {})",
            params.mac_iterations
        )));
    }

    let mut enc_key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password, salt, params.cipher_iterations, &mut enc_key);

    // Separate derivation domain for the MAC key.
    let mut mac_salt = Vec::with_capacity(salt.len() + MAC_DOMAIN.len());
    mac_salt.extend_from_slice(salt);
    mac_salt.extend_from_slice(MAC_DOMAIN);

    let mut mac_key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password, &mac_salt, params.mac_iterations, &mut mac_key);

    Ok((enc_key, mac_key))
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng
        .try_fill_bytes(&mut salt)
        .expect("OS randomness source failed");
    salt
}
