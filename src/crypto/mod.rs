//! Cryptographic primitives for CredVault.
//!
//! This module provides:
//! - PBKDF2-HMAC-SHA256 password-based key derivation (`kdf`)
//! - AES-256-GCM encrypt-then-MAC authenticated tokens (`cipher`)

pub mod cipher;
pub mod kdf;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{VaultCipher, generate_salt, ...};
pub use cipher::{VaultCipher, TOKEN_VERSION};
pub use kdf::{derive_keys, generate_salt, Pbkdf2Params, SALT_LEN};
