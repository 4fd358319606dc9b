use std::path::PathBuf;

use mdag_types::Digest;

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No value is stored under the key.
    #[error("key not found: {0}")]
    NotFound(Digest),

    /// A different value is already stored under the key.
    ///
    /// Content addressing makes this impossible for honest writers; it means
    /// the caller computed the key with the wrong hasher, or the backing
    /// storage was tampered with.
    #[error("conflicting value for key {0}")]
    KeyConflict(Digest),

    /// I/O error from the underlying storage backend.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Value (de)compression failed.
    #[error("compression error for {key}: {reason}")]
    Compression { key: Digest, reason: String },

    /// The backend refuses writes.
    #[error("store is read-only")]
    ReadOnly,
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` for a missing key.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
