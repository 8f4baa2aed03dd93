//! # Record Store (sl-02)
//!
//! Persistence layer shared by every portal subsystem. Domain crates never
//! touch bytes directly: they declare a `Record` and read and write it
//! through a typed `Collection`.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Data Integrity | Every value carries a CRC32 checksum verified on read |
//! | 2 | Atomic Writes | A record and its index entries are written in one batch |
//! | 3 | Unique Indexes | A unique index value maps to at most one record |
//! | 4 | Monotonic Sequences | Named counters never repeat a value |
//! | 5 | Single Writer | One process per data directory (`DataDirLock`) |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - errors, checksum envelope, key layout
//! - `ports/` - `KeyValueStore` and `BlobStore` traits
//! - `adapters/` - in-memory, RocksDB and filesystem implementations, lock
//! - `collection.rs` - typed `Collection<T: Record>`
//! - `sequence.rs` - named monotonic counters
//! - `files.rs` - uploads stored with a SHA-256 digest, verified on read
//!
//! ## Usage
//!
//! ```ignore
//! let kv: Arc<dyn KeyValueStore> = Arc::new(InMemoryKVStore::new());
//! let bills = Collection::<Bill>::new(kv.clone());
//! bills.insert(&bill)?;
//! let pending = bills.find_by_index("status", "pending")?;
//! ```

pub mod adapters;
pub mod collection;
pub mod domain;
pub mod files;
pub mod ports;
pub mod sequence;

pub use adapters::blob::{FsBlobStore, InMemoryBlobStore};
pub use adapters::lock::{DataDirLock, LockError};
pub use adapters::memory::InMemoryKVStore;
#[cfg(feature = "rocksdb")]
pub use adapters::rocksdb_adapter::{RocksDbConfig, RocksDbStore};
pub use collection::{Collection, IndexEntry, Record};
pub use domain::errors::{BlobError, KVStoreError, StoreError};
pub use files::{read_verified, sha256_hex, store_file, Upload};
pub use ports::outbound::{BatchOperation, BlobStore, KeyValueStore, ScanResult};
pub use sequence::Sequence;
