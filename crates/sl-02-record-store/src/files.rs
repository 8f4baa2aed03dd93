//! Storing uploaded files with a verifiable digest.

use crate::domain::errors::StoreError;
use crate::ports::outbound::BlobStore;
use sha2::{Digest, Sha256};
use shared_types::FileRef;

/// A file as received from a client, before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// The file name reduced to blob-key-safe characters.
    pub fn safe_name(&self) -> String {
        let base = self
            .file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default();
        let cleaned: String = base
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let cleaned = cleaned.trim_matches('.');
        if cleaned.is_empty() {
            "file".to_string()
        } else {
            cleaned.to_string()
        }
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Write `upload` under `{prefix}/{safe file name}` and describe it.
pub fn store_file(
    blobs: &dyn BlobStore,
    prefix: &str,
    upload: &Upload,
) -> Result<FileRef, StoreError> {
    let key = format!("{prefix}/{}", upload.safe_name());
    blobs.put(&key, &upload.bytes)?;
    Ok(FileRef {
        key,
        file_name: upload.file_name.clone(),
        content_type: upload.content_type.clone(),
        size: upload.bytes.len() as u64,
        sha256: sha256_hex(&upload.bytes),
    })
}

/// Read a stored file back, refusing content whose digest no longer matches.
pub fn read_verified(blobs: &dyn BlobStore, file: &FileRef) -> Result<Vec<u8>, StoreError> {
    let bytes = blobs.get(&file.key)?;
    if sha256_hex(&bytes) != file.sha256 {
        tracing::error!(key = %file.key, "Stored file failed digest verification");
        return Err(StoreError::DataCorruption {
            key: file.key.clone(),
        });
    }
    Ok(bytes)
}
