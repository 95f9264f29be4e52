use thiserror::Error;

/// All errors that can occur in CredVault.
#[derive(Debug, Error)]
pub enum CredVaultError {
    // --- Entry validation errors ---
    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    // --- Crypto errors ---
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Malformed ciphertext token: {0}")]
    DecryptFailed(String),

    #[error("Integrity check failed — vault tampered or wrong master password")]
    IntegrityFailure,

    // --- Vault errors ---
    #[error("Invalid vault format: {0}")]
    InvalidVaultFormat(String),

    #[error("Vault store is unusable — a save failed and memory diverged from disk")]
    StoreUnusable,

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationFailed(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CredVaultError {
    /// Returns `true` for the decryption-family failures a caller should
    /// present as "authentication failed" when opening a vault.
    ///
    /// A wrong master password and a tampered file are indistinguishable;
    /// both surface through this family.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            CredVaultError::IntegrityFailure | CredVaultError::DecryptFailed(_)
        )
    }
}

/// Convenience type alias for CredVault results.
pub type Result<T> = std::result::Result<T, CredVaultError>;
