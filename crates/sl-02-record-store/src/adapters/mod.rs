//! Storage adapters.
//!
//! - `memory`: `InMemoryKVStore` (tests, `SL_STORAGE_BACKEND=memory`)
//! - `rocksdb_adapter`: `RocksDbStore` (feature `rocksdb`)
//! - `blob`: `InMemoryBlobStore`, `FsBlobStore`
//! - `lock`: `DataDirLock` using fs2

pub mod blob;
pub mod lock;
pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;
