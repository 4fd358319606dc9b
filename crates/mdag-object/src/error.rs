use crate::object::ObjectKind;

/// Errors from encoding, decoding or constructing objects.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ObjectError {
    /// Input ended before a complete object was read.
    #[error("truncated object: needed {needed} more bytes for {field}")]
    Truncated { field: &'static str, needed: usize },

    /// The format version byte is not one this build understands.
    #[error("unsupported object format version: {0}")]
    UnsupportedVersion(u8),

    /// The kind tag byte is not a known object kind.
    #[error("unknown object kind tag: {0}")]
    UnknownKind(u8),

    /// A link name is not valid UTF-8.
    #[error("link name is not valid UTF-8")]
    InvalidName,

    /// Bytes remain after a complete object.
    #[error("{0} trailing bytes after object")]
    TrailingBytes(usize),

    /// Tree entries are not strictly ascending by name.
    #[error("tree entries out of order at {name:?}")]
    Unsorted { name: String },

    /// Two tree entries share a name.
    #[error("duplicate tree entry: {0:?}")]
    DuplicateName(String),

    /// A length does not fit the wire format.
    #[error("{field} too large for encoding: {len}")]
    TooLarge { field: &'static str, len: u64 },

    /// The object is of a different kind than required.
    #[error("expected {expected} object, found {actual}")]
    KindMismatch {
        expected: ObjectKind,
        actual: ObjectKind,
    },
}

/// Result alias for object operations.
pub type ObjectResult<T> = Result<T, ObjectError>;
