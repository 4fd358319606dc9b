//! Content-addressed key-value storage for merkledag.
//!
//! The store maps a [`Digest`](mdag_types::Digest) to the canonical bytes of
//! the object that hashes to it. It never interprets the bytes; encoding,
//! decoding and hashing belong to `mdag-object` and `mdag-dag`.
//!
//! # Storage Backends
//!
//! All backends implement the [`KvStore`] trait:
//!
//! - [`InMemoryKvStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsKvStore`] -- loose-object directory on disk, one file per key
//!
//! # Design Rules
//!
//! 1. Values are immutable once written; the key is the hash of the value.
//! 2. `put` is idempotent: the same `(key, value)` twice is not an error.
//! 3. Concurrent reads and writes are safe.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::{FsKvStore, FsStoreConfig};
pub use memory::InMemoryKvStore;
pub use traits::KvStore;
