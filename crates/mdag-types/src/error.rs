use thiserror::Error;

/// Errors from parsing or constructing a [`Digest`](crate::Digest).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    /// Text is not a hex encoding.
    #[error("digest is not valid hex: {0}")]
    InvalidHex(String),

    /// Decoded bytes are not exactly one digest long.
    #[error("digest must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
