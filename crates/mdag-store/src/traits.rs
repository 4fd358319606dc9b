use mdag_types::Digest;

use crate::error::StoreResult;

/// Content-addressed key-value store.
///
/// All implementations must satisfy these invariants:
/// - Values are immutable once written. The key is the digest of the value,
///   so the same key always maps to the same bytes.
/// - `put` is idempotent and safe to call concurrently, including concurrent
///   puts of the same key.
/// - The store never interprets values -- it is a pure key-value store.
/// - All I/O errors are propagated, never silently ignored.
pub trait KvStore: Send + Sync {
    /// Store `value` under `key`.
    ///
    /// If the key already holds identical bytes this is a no-op. A backend
    /// that notices different bytes under the key returns
    /// [`StoreError::KeyConflict`](crate::StoreError::KeyConflict) and keeps
    /// the original.
    fn put(&self, key: &Digest, value: &[u8]) -> StoreResult<()>;

    /// Fetch the value stored under `key`.
    ///
    /// Returns [`StoreError::NotFound`](crate::StoreError::NotFound) if the
    /// key is absent, other errors on I/O failure.
    fn get(&self, key: &Digest) -> StoreResult<Vec<u8>>;

    /// Check whether a value exists under `key`.
    fn contains(&self, key: &Digest) -> StoreResult<bool>;

    /// Fetch several keys.
    ///
    /// Default implementation calls `get()` for each key. Backends may
    /// override for fewer I/O round-trips.
    fn get_batch(&self, keys: &[Digest]) -> StoreResult<Vec<Vec<u8>>> {
        keys.iter().map(|k| self.get(k)).collect()
    }
}

impl<S: KvStore + ?Sized> KvStore for &S {
    fn put(&self, key: &Digest, value: &[u8]) -> StoreResult<()> {
        (**self).put(key, value)
    }

    fn get(&self, key: &Digest) -> StoreResult<Vec<u8>> {
        (**self).get(key)
    }

    fn contains(&self, key: &Digest) -> StoreResult<bool> {
        (**self).contains(key)
    }

    fn get_batch(&self, keys: &[Digest]) -> StoreResult<Vec<Vec<u8>>> {
        (**self).get_batch(keys)
    }
}

impl<S: KvStore + ?Sized> KvStore for std::sync::Arc<S> {
    fn put(&self, key: &Digest, value: &[u8]) -> StoreResult<()> {
        (**self).put(key, value)
    }

    fn get(&self, key: &Digest) -> StoreResult<Vec<u8>> {
        (**self).get(key)
    }

    fn contains(&self, key: &Digest) -> StoreResult<bool> {
        (**self).contains(key)
    }

    fn get_batch(&self, keys: &[Digest]) -> StoreResult<Vec<Vec<u8>>> {
        (**self).get_batch(keys)
    }
}
