use crate::domain::errors::KVStoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;

/// In-memory key-value store.
///
/// A `BTreeMap` behind a `RwLock`: batches apply under a single write guard,
/// and prefix scans come back in key order like RocksDB iterators.
#[derive(Default)]
pub struct InMemoryKVStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys (records and index entries alike).
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), KVStoreError> {
        self.data.write().remove(key);
        Ok(())
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        let mut data = self.data.write();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        Ok(self.data.read().contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError> {
        let data = self.data.read();
        let results = data
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_kv_store() {
        let store = InMemoryKVStore::new();

        store.put(b"key1", b"value1").unwrap();
        store.put(b"key2", b"value2").unwrap();

        assert_eq!(store.get(b"key1").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(store.get(b"key3").unwrap(), None);

        assert!(store.exists(b"key1").unwrap());
        assert!(!store.exists(b"key3").unwrap());

        store.delete(b"key1").unwrap();
        store.delete(b"missing").unwrap();
        assert!(!store.exists(b"key1").unwrap());
    }

    #[test]
    fn test_in_memory_kv_batch_write() {
        let store = InMemoryKVStore::new();
        store.put(b"c", b"old").unwrap();

        let ops = vec![
            BatchOperation::put(b"a".to_vec(), b"1".to_vec()),
            BatchOperation::put(b"b".to_vec(), b"2".to_vec()),
            BatchOperation::delete(b"c".to_vec()),
        ];
        store.atomic_batch_write(ops).unwrap();

        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get(b"b").unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.get(b"c").unwrap(), None);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_prefix_scan_is_ordered() {
        let store = InMemoryKVStore::new();

        store.put(b"bill:2", b"data2").unwrap();
        store.put(b"bill:1", b"data1").unwrap();
        store.put(b"bills:1", b"other").unwrap();
        store.put(b"user:1", b"u").unwrap();

        let bills = store.prefix_scan(b"bill:").unwrap();
        let keys: Vec<_> = bills.iter().map(|(k, _)| k.as_slice()).collect();
        assert_eq!(keys, vec![b"bill:1".as_slice(), b"bill:2".as_slice()]);
    }
}
