//! # Outbound Ports (Driven Ports)
//!
//! These are the interfaces the host application must provide.

use crate::domain::errors::{BlobError, KVStoreError};

/// Ordered key/value pairs returned by a prefix scan.
pub type ScanResult = Vec<(Vec<u8>, Vec<u8>)>;

/// Abstract interface for key-value database operations.
///
/// Production: `RocksDbStore` (feature `rocksdb`)
/// Testing: `InMemoryKVStore`
///
/// Methods take `&self`; adapters are shared behind `Arc<dyn KeyValueStore>`
/// and synchronize internally.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError>;

    /// Put a single key-value pair.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError>;

    /// Delete a key. Deleting a missing key is not an error.
    fn delete(&self, key: &[u8]) -> Result<(), KVStoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either ALL operations in the batch succeed, or NONE are applied.
    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError>;

    /// Check if a key exists.
    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError>;

    /// All pairs whose key starts with `prefix`, in key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError>;
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Delete a key.
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }
}

/// Abstract interface for file content storage.
///
/// Production: `FsBlobStore`
/// Testing: `InMemoryBlobStore`
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any previous content.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), BlobError>;

    /// Fetch the content under `key`.
    fn get(&self, key: &str) -> Result<Vec<u8>, BlobError>;

    /// Remove the content under `key`. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), BlobError>;
}

/// Reject keys that could escape a blob root or that the filesystem
/// adapter cannot map one-to-one onto a path.
pub fn validate_blob_key(key: &str) -> Result<(), BlobError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/');
    let bad_segment = key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if key.is_empty() || !key.chars().all(allowed) || bad_segment {
        return Err(BlobError::InvalidKey(key.to_string()));
    }
    Ok(())
}
