//! Storage traits and error types
//!
//! This module defines the trait interface for target stores and the
//! associated error types.

use crate::state::TargetMap;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store at {path} is not writable: {source}")]
    Unwritable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Store at {path} cannot be read: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for target store implementations
///
/// The store owns the authoritative copy of every target. Callers load a working
/// copy, mutate it, and hand the complete map back to `save`.
pub trait TargetStore {
    /// Loads the full target map
    ///
    /// Missing storage is created empty, and unparseable storage is moved aside
    /// and reset to empty. Storage that exists but cannot be read is an error
    /// and is left as it is.
    fn try_load(&self) -> StorageResult<TargetMap>;

    /// Like `try_load`, but logs a read failure and returns an empty map
    ///
    /// Never save the result of a failed load: that would overwrite storage
    /// which may still hold every target.
    fn load(&self) -> TargetMap {
        self.try_load().unwrap_or_else(|e| {
            tracing::error!("{}", e);
            TargetMap::new()
        })
    }

    /// Overwrites the storage with the complete map
    fn save(&self, targets: &TargetMap) -> StorageResult<()>;
}
