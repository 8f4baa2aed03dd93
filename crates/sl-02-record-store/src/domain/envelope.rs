//! # Checksum Envelope
//!
//! Every stored value is wrapped as `{ "checksum": <crc32>, "body": "<json>" }`.
//! The checksum covers the exact body bytes and is verified on every read.

use super::errors::StoreError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    checksum: u32,
    body: String,
}

/// Serialize `value` and wrap it with its checksum.
pub fn seal<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    let body = serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let envelope = Envelope {
        checksum: crc32fast::hash(body.as_bytes()),
        body,
    };
    serde_json::to_vec(&envelope).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Verify the checksum and decode the body.
pub fn open<T: DeserializeOwned>(key: &[u8], bytes: &[u8]) -> Result<T, StoreError> {
    let corrupt = || StoreError::DataCorruption {
        key: String::from_utf8_lossy(key).into_owned(),
    };
    let envelope: Envelope = serde_json::from_slice(bytes).map_err(|_| corrupt())?;
    if crc32fast::hash(envelope.body.as_bytes()) != envelope.checksum {
        return Err(corrupt());
    }
    serde_json::from_str(&envelope.body).map_err(|e| StoreError::Serialization(e.to_string()))
}
