//! Error types for the storage engine
//!
//! Provides unified error handling using thiserror.

use bytes::Bytes;
use thiserror::Error;

// == Storage Error Enum ==
/// Unified error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Delete targeted a key with no entry
    #[error("key not found: {}", String::from_utf8_lossy(.0))]
    KeyNotFound(Bytes),

    /// Snapshot file could not be truncated, seeked, written or read
    #[error("snapshot i/o failed: {0}")]
    PersistenceIo(#[from] std::io::Error),

    /// Snapshot content could not be encoded or decoded
    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Returns true for the `KeyNotFound` variant.
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, StorageError::KeyNotFound(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
