//! Error types for the record store.

use shared_types::{Classify, ErrorKind};
use thiserror::Error;

/// Key-value adapter errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },
    /// Data corruption reported by the backend.
    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },
}

/// Blob adapter errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BlobError {
    /// Key contains characters outside `[A-Za-z0-9._-/]` or a `..` segment.
    #[error("Invalid blob key: {0}")]
    InvalidKey(String),
    /// No blob under this key.
    #[error("Blob not found: {0}")]
    NotFound(String),
    /// Underlying I/O failure.
    #[error("Blob I/O error: {0}")]
    Io(String),
}

/// Errors surfaced by collections and sequences.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error(transparent)]
    Kv(#[from] KVStoreError),

    #[error(transparent)]
    Blob(#[from] BlobError),

    /// Stored bytes failed checksum verification.
    #[error("Data corruption detected at key {key}")]
    DataCorruption { key: String },

    /// Record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// No record with this id.
    #[error("{collection} {id} not found")]
    NotFound { collection: &'static str, id: String },

    /// A record with this id already exists.
    #[error("{collection} {id} already exists")]
    Duplicate { collection: &'static str, id: String },

    /// Another record already holds this unique index value.
    #[error("{collection} with {index} '{value}' already exists")]
    UniqueViolation {
        collection: &'static str,
        index: &'static str,
        value: String,
    },
}

impl Classify for StoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound { .. } | StoreError::Blob(BlobError::NotFound(_)) => {
                ErrorKind::NotFound
            }
            StoreError::Duplicate { .. } | StoreError::UniqueViolation { .. } => {
                ErrorKind::Conflict
            }
            StoreError::Blob(BlobError::InvalidKey(_)) => ErrorKind::Invalid,
            StoreError::Kv(_)
            | StoreError::Blob(BlobError::Io(_))
            | StoreError::DataCorruption { .. }
            | StoreError::Serialization(_) => ErrorKind::Storage,
        }
    }
}
