//! Named monotonic counters (CIDs, bill numbers).

use crate::domain::envelope;
use crate::domain::errors::StoreError;
use crate::domain::keys;
use crate::ports::outbound::KeyValueStore;
use parking_lot::Mutex;
use std::sync::Arc;

/// A persisted counter. `next()` never returns the same value twice for a
/// given store, including across restarts.
pub struct Sequence {
    kv: Arc<dyn KeyValueStore>,
    key: Vec<u8>,
    guard: Mutex<()>,
}

impl Sequence {
    pub fn new(kv: Arc<dyn KeyValueStore>, name: &str) -> Self {
        Self {
            kv,
            key: keys::sequence(name),
            guard: Mutex::new(()),
        }
    }

    /// Last value handed out (0 if none yet).
    pub fn current(&self) -> Result<u64, StoreError> {
        match self.kv.get(&self.key)? {
            Some(bytes) => envelope::open(&self.key, &bytes),
            None => Ok(0),
        }
    }

    /// Advance and return the new value, starting at 1.
    pub fn next(&self) -> Result<u64, StoreError> {
        let _guard = self.guard.lock();
        let value = self.current()? + 1;
        self.kv.put(&self.key, &envelope::seal(&value)?)?;
        Ok(value)
    }
}
