//! Persistent key-value storage for the Portal session.
//!
//! This crate provides:
//! - The [`KeyValueStore`] contract (`get` / `set` / `remove` on strings)
//! - **Memory**: [`MemoryStore`], process-local, for tests and ephemeral runs
//! - **File**: [`FileStore`], a JSON document rewritten atomically on every change
//! - [`SessionVault`], the typed view over the five session keys

mod file;
mod keys;
mod memory;
mod traits;
mod vault;

pub use file::FileStore;
pub use keys::StorageKeys;
pub use memory::MemoryStore;
pub use traits::KeyValueStore;
pub use vault::{Profile, SessionVault, ThrottleCounters};

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific storage error
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Open the durable store at `path`.
pub fn open_file_store(path: &Path) -> StorageResult<Arc<dyn KeyValueStore>> {
    let store = FileStore::open(path)?;
    Ok(Arc::new(store))
}

/// Create a [`SessionVault`] over the durable store at `path`.
pub fn open_session_vault(path: &Path) -> StorageResult<SessionVault> {
    Ok(SessionVault::new(open_file_store(path)?))
}
