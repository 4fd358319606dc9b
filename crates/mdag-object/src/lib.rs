//! Object model for merkledag.
//!
//! Three object kinds make up every DAG:
//!
//! - `Chunk` -- raw leaf bytes
//! - `List` -- ordered links to chunks; one large file split into pieces
//! - `Tree` -- links sorted by name; one directory
//!
//! An object's [`Digest`](mdag_types::Digest) is the hash of its canonical
//! encoding (see [`codec`]), which always starts with an explicit kind tag.
//! An empty list or empty tree is therefore never mistaken for a chunk.

pub mod codec;
pub mod error;
pub mod object;

pub use codec::FORMAT_VERSION;
pub use error::{ObjectError, ObjectResult};
pub use object::{Link, Object, ObjectKind};
