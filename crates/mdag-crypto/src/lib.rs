//! Hashing primitives for merkledag.
//!
//! The DAG never hashes through a global function. Callers inject an
//! [`ObjectHasher`] (a stateful reset / update / finalize unit), normally
//! borrowed from a [`HasherPool`] so that concurrent builders each own
//! their hasher for the duration of one computation.
//!
//! Both algorithms come from the `blake3` and `sha2` crates.

pub mod hasher;
pub mod pool;

pub use hasher::{Blake3Hasher, HashAlgorithm, HasherError, ObjectHasher, Sha256Hasher};
pub use pool::{HasherPool, PooledHasher};
