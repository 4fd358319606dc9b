use std::collections::HashMap;
use std::sync::RwLock;

use mdag_types::Digest;

use crate::error::{StoreError, StoreResult};
use crate::traits::KvStore;

/// In-memory, HashMap-based key-value store.
///
/// Intended for tests and embedding. Values are held behind a `RwLock` for
/// safe concurrent access and cloned on read.
pub struct InMemoryKvStore {
    values: RwLock<HashMap<Digest, Vec<u8>>>,
}

impl InMemoryKvStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.values.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.values.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored values.
    pub fn total_bytes(&self) -> u64 {
        self.values
            .read()
            .expect("lock poisoned")
            .values()
            .map(|v| v.len() as u64)
            .sum()
    }

    /// Sorted list of all keys in the store.
    pub fn keys(&self) -> Vec<Digest> {
        let map = self.values.read().expect("lock poisoned");
        let mut keys: Vec<Digest> = map.keys().copied().collect();
        keys.sort();
        keys
    }

    /// Overwrite a value without any checks.
    ///
    /// Test hook for simulating on-disk corruption; never use it to store
    /// real objects.
    #[doc(hidden)]
    pub fn put_unchecked(&self, key: Digest, value: Vec<u8>) {
        self.values.write().expect("lock poisoned").insert(key, value);
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for InMemoryKvStore {
    fn put(&self, key: &Digest, value: &[u8]) -> StoreResult<()> {
        let mut map = self.values.write().expect("lock poisoned");
        match map.get(key) {
            Some(existing) if existing.as_slice() == value => Ok(()),
            Some(_) => Err(StoreError::KeyConflict(*key)),
            None => {
                map.insert(*key, value.to_vec());
                Ok(())
            }
        }
    }

    fn get(&self, key: &Digest) -> StoreResult<Vec<u8>> {
        let map = self.values.read().expect("lock poisoned");
        map.get(key).cloned().ok_or(StoreError::NotFound(*key))
    }

    fn contains(&self, key: &Digest) -> StoreResult<bool> {
        let map = self.values.read().expect("lock poisoned");
        Ok(map.contains_key(key))
    }
}

impl std::fmt::Debug for InMemoryKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryKvStore")
            .field("key_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u8) -> Digest {
        Digest::from_hash([n; 32])
    }

    #[test]
    fn put_and_get() {
        let store = InMemoryKvStore::new();
        store.put(&key(1), b"hello world").unwrap();
        assert_eq!(store.get(&key(1)).unwrap(), b"hello world");
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = InMemoryKvStore::new();
        let err = store.get(&key(9)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(k) if k == key(9)));
        assert!(err.is_not_found());
    }

    #[test]
    fn put_is_idempotent() {
        let store = InMemoryKvStore::new();
        store.put(&key(1), b"same").unwrap();
        store.put(&key(1), b"same").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.keys(), vec![key(1)]);
    }

    #[test]
    fn conflicting_put_keeps_original() {
        let store = InMemoryKvStore::new();
        store.put(&key(1), b"first").unwrap();
        let err = store.put(&key(1), b"second").unwrap_err();
        assert!(matches!(err, StoreError::KeyConflict(_)));
        assert_eq!(store.get(&key(1)).unwrap(), b"first");
    }

    #[test]
    fn contains_reflects_puts() {
        let store = InMemoryKvStore::new();
        assert!(!store.contains(&key(1)).unwrap());
        store.put(&key(1), b"x").unwrap();
        assert!(store.contains(&key(1)).unwrap());
    }

    #[test]
    fn get_batch_fails_on_first_missing() {
        let store = InMemoryKvStore::new();
        store.put(&key(1), b"a").unwrap();
        assert_eq!(store.get_batch(&[key(1)]).unwrap(), vec![b"a".to_vec()]);
        assert!(store.get_batch(&[key(1), key(2)]).is_err());
    }

    #[test]
    fn len_total_bytes_and_sorted_keys() {
        let store = InMemoryKvStore::new();
        assert!(store.is_empty());
        store.put(&key(3), b"12345").unwrap();
        store.put(&key(1), b"123456789").unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.total_bytes(), 14);
        assert_eq!(store.keys(), vec![key(1), key(3)]);
    }

    #[test]
    fn concurrent_identical_puts_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryKvStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for n in 0..32u8 {
                        store.put(&key(n), &[n; 16]).unwrap();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().expect("thread should not panic");
        }
        assert_eq!(store.len(), 32);
    }

    #[test]
    fn works_through_references_and_arcs() {
        let store = std::sync::Arc::new(InMemoryKvStore::new());
        fn write<S: KvStore>(s: S) {
            s.put(&Digest::from_hash([5; 32]), b"v").unwrap();
        }
        write(&*store);
        write(std::sync::Arc::clone(&store));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn debug_format() {
        let store = InMemoryKvStore::new();
        store.put(&key(1), b"x").unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryKvStore"));
        assert!(debug.contains("key_count"));
    }
}
