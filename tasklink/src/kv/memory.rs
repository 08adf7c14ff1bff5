//! In-process key-value backend.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::{KvError, KvStore};

/// A [`KvStore`] backed by a `HashMap`.
///
/// Thread-safe via [`parking_lot::Mutex`]; the lock is never held across an
/// await point, so each call is atomic with respect to every other call.
/// Nothing is persisted when the process exits.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKv {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if no keys are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Number of keys starting with `prefix`.
    #[must_use]
    pub fn count_with_prefix(&self, prefix: &str) -> usize {
        self.entries
            .lock()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .count()
    }
}

impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), KvError> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: Vec<u8>,
    ) -> Result<bool, KvError> {
        let mut entries = self.entries.lock();
        if entries.get(key).map(Vec::as_slice) != expected {
            return Ok(false);
        }
        entries.insert(key.to_string(), value);
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
