use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

use crate::hasher::{HashAlgorithm, ObjectHasher};

/// A pool of idle hashers of one algorithm.
///
/// [`get`](Self::get) hands out a [`PooledHasher`] guard that owns its hasher
/// exclusively and puts it back (reset) when dropped. The pool grows on
/// demand, so concurrent workers never wait on each other for a hasher.
pub struct HasherPool {
    algorithm: HashAlgorithm,
    prototype: Mutex<Box<dyn ObjectHasher>>,
    idle: Mutex<Vec<Box<dyn ObjectHasher>>>,
}

impl HasherPool {
    /// Create an empty pool for the given algorithm.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self::seeded(algorithm.hasher())
    }

    /// Create a pool from an injected hasher.
    ///
    /// The hasher itself becomes the first idle entry; further hashers are
    /// produced with [`ObjectHasher::fresh`].
    pub fn seeded(hasher: Box<dyn ObjectHasher>) -> Self {
        let prototype = hasher.fresh();
        Self {
            algorithm: hasher.algorithm(),
            prototype: Mutex::new(prototype),
            idle: Mutex::new(vec![hasher]),
        }
    }

    /// Algorithm of every hasher in this pool.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Borrow a reset hasher for exclusive use.
    pub fn get(&self) -> PooledHasher<'_> {
        let reused = self.idle.lock().expect("hasher pool poisoned").pop();
        let mut hasher = match reused {
            Some(hasher) => hasher,
            None => self.prototype.lock().expect("hasher pool poisoned").fresh(),
        };
        hasher.reset();
        PooledHasher {
            pool: self,
            hasher: Some(hasher),
        }
    }

    /// Number of idle hashers waiting for reuse.
    pub fn idle(&self) -> usize {
        self.idle.lock().expect("hasher pool poisoned").len()
    }

    fn release(&self, mut hasher: Box<dyn ObjectHasher>) {
        hasher.reset();
        self.idle.lock().expect("hasher pool poisoned").push(hasher);
    }
}

impl std::fmt::Debug for HasherPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HasherPool")
            .field("algorithm", &self.algorithm)
            .field("idle", &self.idle())
            .finish()
    }
}

/// A hasher on loan from a [`HasherPool`].
pub struct PooledHasher<'a> {
    pool: &'a HasherPool,
    hasher: Option<Box<dyn ObjectHasher>>,
}

impl Deref for PooledHasher<'_> {
    type Target = dyn ObjectHasher;

    fn deref(&self) -> &Self::Target {
        // Only `Drop` takes the hasher out.
        self.hasher.as_deref().expect("pooled hasher already released")
    }
}

impl DerefMut for PooledHasher<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.hasher
            .as_deref_mut()
            .expect("pooled hasher already released")
    }
}

impl Drop for PooledHasher<'_> {
    fn drop(&mut self) {
        if let Some(hasher) = self.hasher.take() {
            self.pool.release(hasher);
        }
    }
}
