//! Merkle DAG construction and path resolution.
//!
//! [`DagBuilder`] turns a filesystem tree ([`mdag_fs::Node`]) into stored
//! objects and returns the root [`Digest`](mdag_types::Digest):
//!
//! - files no larger than the chunk size become a single chunk
//! - larger files are split by the [`Chunker`] into chunks plus a list
//! - directories become trees whose links are sorted by name
//!
//! [`Resolver`] walks a root digest and a slash-separated path back down to
//! the original bytes, reassembling chunked files on the way.
//!
//! The same input tree always produces the same root digest, whatever order
//! its directories enumerate their children in, and adding it again leaves
//! the store unchanged.

pub mod builder;
pub mod cancel;
pub mod chunker;
pub mod config;
pub mod error;
pub mod resolver;

pub use builder::{add, BuildOutput, BuildStats, DagBuilder};
pub use cancel::CancelToken;
pub use chunker::{part_name, Chunker, WrittenFile};
pub use config::{DagConfig, DEFAULT_CHUNK_SIZE};
pub use error::{DagError, DagResult, ErrorKind};
pub use resolver::{resolve, Entry, Resolver, VerifyReport};
