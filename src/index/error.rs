//! Index error types
//!
//! Structural errors that abort a top-level operation (create/open/sync).
//! Per-file indexing failures are never raised as errors; the builder
//! records them as problem strings and keeps going.

use crate::vfs::VfsError;
use thiserror::Error;

/// Errors that abort an index operation
#[derive(Error, Debug)]
pub enum IndexError {
    /// Missing or mis-typed configuration parameter
    #[error("Configuration error: {0}")]
    Config(String),

    /// Index root or configuration blob absent on open
    #[error("Index not found: {0}")]
    NotFound(String),

    /// Create without replace hit an existing index root
    #[error("Index exists: {0}")]
    AlreadyExists(String),

    /// Storage backend failure on the index side
    #[error("Storage error: {0}")]
    Storage(#[from] VfsError),

    /// Config or manifest blob could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for IndexError {
    fn from(err: serde_json::Error) -> Self {
        IndexError::Serialization(err.to_string())
    }
}

/// Result type alias for index operations
pub type IndexResult<T> = Result<T, IndexError>;
