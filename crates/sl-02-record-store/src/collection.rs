//! # Typed Collections
//!
//! A `Collection<T>` maps a `Record` type onto the key-value port: one
//! sealed value per record plus one key per index entry, always written in
//! a single atomic batch.

use crate::domain::envelope;
use crate::domain::errors::StoreError;
use crate::domain::keys;
use crate::ports::outbound::{BatchOperation, KeyValueStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

/// One secondary index value of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub name: &'static str,
    pub value: String,
    pub unique: bool,
}

impl IndexEntry {
    pub fn new(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
            unique: false,
        }
    }

    /// An index whose value may belong to at most one record.
    pub fn unique(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
            unique: true,
        }
    }

    fn key(&self, collection: &str, id: &str) -> Vec<u8> {
        if self.unique {
            keys::unique(collection, self.name, &self.value)
        } else {
            keys::index(collection, self.name, &self.value, id)
        }
    }
}

/// A persistable entity.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    /// Collection name; also the key prefix.
    const COLLECTION: &'static str;

    /// Primary key.
    fn id(&self) -> String;

    /// Secondary index entries derived from the current field values.
    fn indexes(&self) -> Vec<IndexEntry> {
        Vec::new()
    }
}

/// Typed view over the records of one collection.
pub struct Collection<T: Record> {
    kv: Arc<dyn KeyValueStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Record> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            kv: self.kv.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            _marker: PhantomData,
        }
    }

    /// Store a new record.
    ///
    /// Fails with `Duplicate` if the id is taken and `UniqueViolation` if a
    /// unique index value already belongs to another record.
    pub fn insert(&self, record: &T) -> Result<(), StoreError> {
        let id = record.id();
        let key = keys::record(T::COLLECTION, &id);
        if self.kv.exists(&key)? {
            return Err(StoreError::Duplicate {
                collection: T::COLLECTION,
                id,
            });
        }

        let indexes = record.indexes();
        self.check_unique(&id, &indexes)?;

        let mut ops = vec![BatchOperation::put(key, envelope::seal(record)?)];
        ops.extend(
            indexes
                .iter()
                .map(|ix| BatchOperation::put(ix.key(T::COLLECTION, &id), id.as_bytes())),
        );
        self.kv.atomic_batch_write(ops)?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        let key = keys::record(T::COLLECTION, id);
        match self.kv.get(&key)? {
            Some(bytes) => envelope::open(&key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Like `get`, but a missing record is `NotFound`.
    pub fn require(&self, id: &str) -> Result<T, StoreError> {
        self.get(id)?.ok_or_else(|| StoreError::NotFound {
            collection: T::COLLECTION,
            id: id.to_string(),
        })
    }

    /// Load, mutate and store a record; stale index entries are replaced in
    /// the same batch as the record. If `f` fails nothing is written.
    pub fn update<E, F>(&self, id: &str, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut T) -> Result<(), E>,
    {
        let mut record = self.require(id)?;
        let before = record.indexes();
        f(&mut record)?;
        self.write_over(id, &before, &record)?;
        Ok(record)
    }

    /// Remove a record and its index entries. Returns the removed record.
    pub fn delete(&self, id: &str) -> Result<Option<T>, StoreError> {
        let Some(record) = self.get(id)? else {
            return Ok(None);
        };
        let mut ops = vec![BatchOperation::delete(keys::record(T::COLLECTION, id))];
        ops.extend(
            record
                .indexes()
                .iter()
                .map(|ix| BatchOperation::delete(ix.key(T::COLLECTION, id))),
        );
        self.kv.atomic_batch_write(ops)?;
        Ok(Some(record))
    }

    /// Every record in the collection, in id order.
    pub fn all(&self) -> Result<Vec<T>, StoreError> {
        self.kv
            .prefix_scan(&keys::record_prefix(T::COLLECTION))?
            .into_iter()
            .map(|(key, bytes)| envelope::open(&key, &bytes))
            .collect()
    }

    /// Records whose index `name` currently has `value`.
    pub fn find_by_index(&self, name: &'static str, value: &str) -> Result<Vec<T>, StoreError> {
        let prefix = keys::index_prefix(T::COLLECTION, name, value);
        let mut out = Vec::new();
        for (_, id) in self.kv.prefix_scan(&prefix)? {
            let id = String::from_utf8_lossy(&id).into_owned();
            if let Some(record) = self.get(&id)? {
                out.push(record);
            }
        }
        Ok(out)
    }

    /// The record holding unique index value `value`, if any.
    pub fn find_unique(&self, name: &'static str, value: &str) -> Result<Option<T>, StoreError> {
        match self.kv.get(&keys::unique(T::COLLECTION, name, value))? {
            Some(id) => self.get(&String::from_utf8_lossy(&id)),
            None => Ok(None),
        }
    }

    fn check_unique(&self, id: &str, indexes: &[IndexEntry]) -> Result<(), StoreError> {
        for ix in indexes.iter().filter(|ix| ix.unique) {
            if let Some(owner) = self.kv.get(&ix.key(T::COLLECTION, id))? {
                if owner != id.as_bytes() {
                    return Err(StoreError::UniqueViolation {
                        collection: T::COLLECTION,
                        index: ix.name,
                        value: ix.value.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn write_over(&self, id: &str, before: &[IndexEntry], record: &T) -> Result<(), StoreError> {
        let after = record.indexes();
        self.check_unique(id, &after)?;

        let keep: HashSet<Vec<u8>> = after.iter().map(|ix| ix.key(T::COLLECTION, id)).collect();
        let mut ops: Vec<BatchOperation> = before
            .iter()
            .map(|ix| ix.key(T::COLLECTION, id))
            .filter(|key| !keep.contains(key))
            .map(BatchOperation::delete)
            .collect();
        ops.push(BatchOperation::put(
            keys::record(T::COLLECTION, id),
            envelope::seal(record)?,
        ));
        ops.extend(keep.into_iter().map(|key| BatchOperation::put(key, id.as_bytes())));
        self.kv.atomic_batch_write(ops)?;
        Ok(())
    }
}
