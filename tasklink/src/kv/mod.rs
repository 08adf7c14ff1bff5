//! Storage port for the engine.
//!
//! The engine only needs four primitives over opaque byte blobs keyed by
//! string: read, blind write, compare-and-set, and delete. Every durable
//! backend is adapted to [`KvStore`]; [`MemoryKv`] is the in-process one.

pub mod memory;

pub use memory::MemoryKv;

/// Errors reported by a storage backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KvError {
    /// The backend could not complete the request.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Key-value backend with single-key compare-and-set.
///
/// There are no multi-key transactions. `compare_and_set` is the only
/// concurrency primitive: it writes `value` only if the key currently holds
/// exactly `expected` (`None` meaning the key must be absent) and reports
/// whether the write happened.
pub trait KvStore: Send + Sync {
    /// Reads the value stored under `key`, if any.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<Vec<u8>>, KvError>> + Send;

    /// Unconditionally stores `value` under `key`.
    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
    ) -> impl std::future::Future<Output = Result<(), KvError>> + Send;

    /// Stores `value` under `key` only if the current value equals `expected`.
    ///
    /// Returns `Ok(false)` when the current value differs; that is a lost
    /// race, not an error.
    fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: Vec<u8>,
    ) -> impl std::future::Future<Output = Result<bool, KvError>> + Send;

    /// Removes `key`. Deleting an absent key succeeds.
    fn delete(&self, key: &str) -> impl std::future::Future<Output = Result<(), KvError>> + Send;
}
