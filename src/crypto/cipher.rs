//! Authenticated encryption engine: AES-256-GCM wrapped in
//! encrypt-then-MAC with HMAC-SHA256.
//!
//! Each call to `encrypt` generates a fresh random 12-byte nonce, then
//! tags `nonce || ciphertext` with an HMAC under a dedicated MAC key.
//! `decrypt` verifies the MAC in constant time before any cipher work.
//!
//! Layout of a token (fixed, versioned):
//!   [ version: 1 byte | HMAC-SHA256: 32 bytes | 12-byte nonce | ciphertext + 16-byte auth tag ]

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::errors::{CredVaultError, Result};

use super::kdf::{self, Pbkdf2Params, SALT_LEN};

/// Current token format version.
pub const TOKEN_VERSION: u8 = 1;

/// Size of the HMAC-SHA256 tag in bytes.
const MAC_LEN: usize = 32;

/// Size of the AES-256-GCM nonce in bytes.
const NONCE_LEN: usize = 12;

/// Fixed token prefix: 1 (version) + 32 (MAC).
const PREFIX_LEN: usize = 1 + MAC_LEN;

type HmacSha256 = Hmac<Sha256>;

/// Keyed cipher for a single vault.
///
/// Holds the encryption key, the MAC key, and the master password the
/// keys were derived from (so the salt can be rotated when an existing
/// vault's salt is read from disk). All key material is zeroized on drop.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct VaultCipher {
    master_password: Zeroizing<Vec<u8>>,
    salt: [u8; SALT_LEN],
    enc_key: [u8; 32],
    mac_key: [u8; 32],
    #[zeroize(skip)]
    params: Pbkdf2Params,
}

impl VaultCipher {
    /// Derive both keys from `master_password` + `salt` and build a cipher.
    pub fn new(master_password: &[u8], salt: [u8; SALT_LEN], params: Pbkdf2Params) -> Result<Self> {
        let (enc_key, mac_key) = kdf::derive_keys(master_password, &salt, &params)?;
        Ok(Self {
            master_password: Zeroizing::new(master_password.to_vec()),
            salt,
            enc_key,
            mac_key,
            params,
        })
    }

    /// Re-derive both keys over a new salt.
    ///
    /// Used when opening an existing vault: the salt comes from the file,
    /// and both keys must be re-derived before any decrypt call.
    pub fn rotate_salt(&mut self, salt: [u8; SALT_LEN]) -> Result<()> {
        let (enc_key, mac_key) = kdf::derive_keys(&self.master_password, &salt, &self.params)?;
        self.enc_key.zeroize();
        self.mac_key.zeroize();
        self.enc_key = enc_key;
        self.mac_key = mac_key;
        self.salt = salt;
        Ok(())
    }

    /// Encrypt `plaintext` into an opaque authenticated token.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = Aes256Gcm::new_from_slice(&self.enc_key)
            .map_err(|e| CredVaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| CredVaultError::EncryptionFailed(format!("encryption error: {e}")))?;

        // MAC over nonce || ciphertext, so a moved nonce is also caught.
        let mut body = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        body.extend_from_slice(&nonce);
        body.extend_from_slice(&ciphertext);

        // Qualified: `aead::KeyInit` is also in scope and supplies a
        // `new_from_slice` of its own.
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.mac_key)
            .map_err(|e| CredVaultError::EncryptionFailed(format!("invalid MAC key: {e}")))?;
        mac.update(&body);
        let tag = mac.finalize().into_bytes();

        let mut token = Vec::with_capacity(PREFIX_LEN + body.len());
        token.push(TOKEN_VERSION);
        token.extend_from_slice(&tag);
        token.extend_from_slice(&body);
        Ok(token)
    }

    /// Decrypt a token produced by `encrypt`.
    ///
    /// Verifies the HMAC in constant time (`Mac::verify_slice`) before
    /// touching the cipher. A MAC mismatch — tampering or a wrong master
    /// password — fails with `IntegrityFailure`. A malformed token fails
    /// with `DecryptFailed`. Cipher failure after a valid MAC should not
    /// occur and is treated as an integrity failure.
    pub fn decrypt(&self, token: &[u8]) -> Result<Vec<u8>> {
        if token.len() < PREFIX_LEN + NONCE_LEN {
            return Err(CredVaultError::DecryptFailed("token too short".into()));
        }
        if token[0] != TOKEN_VERSION {
            return Err(CredVaultError::DecryptFailed(format!(
                "unsupported token version {}, expected {TOKEN_VERSION}",
                token[0]
            )));
        }

        let (tag, body) = token[1..].split_at(MAC_LEN);

        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.mac_key)
            .map_err(|e| CredVaultError::DecryptFailed(format!("invalid MAC key: {e}")))?;
        mac.update(body);
        mac.verify_slice(tag)
            .map_err(|_| CredVaultError::IntegrityFailure)?;

        let (nonce_bytes, ciphertext) = body.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let cipher = Aes256Gcm::new_from_slice(&self.enc_key)
            .map_err(|_| CredVaultError::IntegrityFailure)?;

        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CredVaultError::IntegrityFailure)
    }

    /// The salt the current keys were derived from.
    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    /// The PBKDF2 parameters in effect.
    pub fn params(&self) -> Pbkdf2Params {
        self.params
    }
}
