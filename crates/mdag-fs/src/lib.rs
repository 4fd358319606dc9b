//! Filesystem tree abstraction for merkledag.
//!
//! A [`Node`] is either a [`FileNode`] (name, logical size, bytes) or a
//! [`DirNode`] (name, logical size, children). Both come in two flavours:
//!
//! - in memory, built with [`Node::file`] and [`Node::dir`] -- used by tests
//!   and by callers that assemble trees programmatically
//! - on disk, opened with [`Node::from_path`] -- children are enumerated
//!   lazily with `walkdir`, sorted by file name, and file bytes are read only
//!   when asked for
//!
//! Directory enumeration is restartable: every call to
//! [`DirNode::children`] returns a fresh listing.

pub mod disk;
pub mod error;
pub mod node;

pub use disk::WalkOptions;
pub use error::{FsError, FsResult};
pub use node::{DirNode, FileNode, Node};
