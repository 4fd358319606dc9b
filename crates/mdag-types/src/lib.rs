//! Foundation types for merkledag.
//!
//! Every other merkledag crate depends on `mdag-types` for the [`Digest`]
//! type: the content address under which an object is stored and by which
//! parents refer to their children.

pub mod digest;
pub mod error;

pub use digest::{Digest, DIGEST_LEN};
pub use error::TypeError;
