//! Error types for building and resolving DAGs.

use std::fmt;

use mdag_fs::FsError;
use mdag_object::{ObjectError, ObjectKind};
use mdag_store::StoreError;
use mdag_types::Digest;

/// Errors that can occur while building or resolving a DAG.
///
/// Build errors carry the slash-joined path (relative to the root node) of
/// the entry being built. Resolve errors carry the path segment that failed.
#[derive(Debug, thiserror::Error)]
pub enum DagError {
    /// No object is stored under the digest.
    #[error("object not found: {0}")]
    NotFound(Digest),

    /// A path segment does not name an entry of the tree it was looked up in.
    #[error("no entry {segment:?} in {parent:?}")]
    NoSuchEntry {
        /// The segment that did not match.
        segment: String,
        /// The path resolved so far.
        parent: String,
    },

    /// Stored bytes are not a valid object, or do not match how they are used.
    #[error("corrupt object {digest}: {reason}")]
    CorruptObject { digest: Digest, reason: String },

    /// The object could not be decoded.
    #[error("corrupt object {digest}: {source}")]
    Decode {
        digest: Digest,
        #[source]
        source: ObjectError,
    },

    /// A directory was reached with no path left to select a file.
    #[error("{path:?} is a directory")]
    IsDirectory { path: String },

    /// A path segment was applied to a file object, or a directory listing
    /// was asked of one.
    #[error("{path:?} is a {kind}, not a directory")]
    NotADirectory {
        /// Segment that was to be looked up, empty for a listing.
        segment: String,
        path: String,
        kind: ObjectKind,
    },

    /// Writing an object failed.
    #[error("failed to store object for {path:?}: {source}")]
    Persist {
        path: String,
        #[source]
        source: StoreError,
    },

    /// Reading an object failed for a reason other than it being absent.
    #[error("failed to fetch object {digest}: {source}")]
    Fetch {
        digest: Digest,
        #[source]
        source: StoreError,
    },

    /// The operation was cancelled or its deadline passed.
    #[error("operation cancelled")]
    Cancelled,

    /// A directory contains itself.
    #[error("directory cycle at {path:?}")]
    CycleDetected { path: String },

    /// The tree is nested deeper than the configured limit.
    #[error("{path:?} exceeds maximum depth {limit}")]
    DepthExceeded { path: String, limit: usize },

    /// An entry name is empty or contains a path separator.
    #[error("invalid entry name {name:?} in {dir:?}")]
    InvalidName { dir: String, name: String },

    /// Two siblings share a name.
    #[error("duplicate entry {name:?} in {dir:?}")]
    DuplicateEntry { dir: String, name: String },

    /// A file's content length differs from its reported size.
    #[error("{path:?} changed while reading: expected {expected} bytes, read {actual}")]
    SizeMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },

    /// Reading the input tree failed.
    #[error("failed to read {path:?}: {source}")]
    Fs {
        path: String,
        #[source]
        source: FsError,
    },

    /// A configuration value is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Broad category of a [`DagError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    CorruptObject,
    InvalidPath,
    PersistenceFailure,
    Cancelled,
    InvalidInput,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not found",
            Self::CorruptObject => "corrupt object",
            Self::InvalidPath => "invalid path",
            Self::PersistenceFailure => "persistence failure",
            Self::Cancelled => "cancelled",
            Self::InvalidInput => "invalid input",
        };
        f.write_str(s)
    }
}

impl DagError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::NoSuchEntry { .. } => ErrorKind::NotFound,
            Self::CorruptObject { .. } | Self::Decode { .. } => ErrorKind::CorruptObject,
            Self::IsDirectory { .. } | Self::NotADirectory { .. } => ErrorKind::InvalidPath,
            Self::Persist { .. } | Self::Fetch { .. } => ErrorKind::PersistenceFailure,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::CycleDetected { .. }
            | Self::DepthExceeded { .. }
            | Self::InvalidName { .. }
            | Self::DuplicateEntry { .. }
            | Self::SizeMismatch { .. }
            | Self::Fs { .. }
            | Self::InvalidConfig(_) => ErrorKind::InvalidInput,
        }
    }

    pub(crate) fn corrupt(digest: Digest, reason: impl Into<String>) -> Self {
        Self::CorruptObject {
            digest,
            reason: reason.into(),
        }
    }

    pub(crate) fn fetch(digest: Digest, source: StoreError) -> Self {
        if source.is_not_found() {
            Self::NotFound(digest)
        } else {
            Self::Fetch { digest, source }
        }
    }

    pub(crate) fn fs(path: &str, source: FsError) -> Self {
        match source {
            FsError::Loop { .. } => Self::CycleDetected {
                path: path.to_string(),
            },
            source => Self::Fs {
                path: path.to_string(),
                source,
            },
        }
    }
}

/// Convenience alias for DAG results.
pub type DagResult<T> = Result<T, DagError>;
