//! Vault module — encrypted entry persistence.
//!
//! This module provides:
//! - Binary vault envelope with atomic writes (`format`)
//! - High-level `VaultStore` owning the entry collection (`store`)

pub mod format;
pub mod store;

// Re-export the most commonly used items.
pub use format::{RawVault, StoredKdfParams, VaultHeader};
pub use store::VaultStore;
