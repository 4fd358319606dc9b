use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::disk::{self, WalkOptions};
use crate::error::{FsError, FsResult};

/// A node of a filesystem tree: exactly a file or a directory.
#[derive(Clone, Debug)]
pub enum Node {
    File(FileNode),
    Directory(DirNode),
}

impl Node {
    /// An in-memory file.
    pub fn file(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let data: Arc<[u8]> = data.into().into();
        Self::File(FileNode {
            name: name.into(),
            size: data.len() as u64,
            source: FileSource::Memory(data),
        })
    }

    /// An in-memory directory. Children may be given in any order.
    pub fn dir(name: impl Into<String>, children: Vec<Node>) -> Self {
        Self::Directory(DirNode {
            name: name.into(),
            source: DirSource::Memory(children),
        })
    }

    /// Open a file or directory on disk with default [`WalkOptions`].
    pub fn from_path(path: impl AsRef<Path>) -> FsResult<Self> {
        Self::from_path_with(path, WalkOptions::default())
    }

    /// Open a file or directory on disk.
    ///
    /// The node's name is the final path component, or empty for a path
    /// without one (such as `/`).
    pub fn from_path_with(path: impl AsRef<Path>, options: WalkOptions) -> FsResult<Self> {
        disk::open(path.as_ref(), options)
    }

    pub fn name(&self) -> &str {
        match self {
            Self::File(f) => f.name(),
            Self::Directory(d) => d.name(),
        }
    }

    /// Logical byte size: a file's length, or the total over a directory's
    /// descendant files.
    pub fn size(&self) -> FsResult<u64> {
        match self {
            Self::File(f) => Ok(f.size()),
            Self::Directory(d) => d.size(),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    /// Where this node lives on disk, if anywhere.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(f) => f.path(),
            Self::Directory(d) => d.path(),
        }
    }
}

#[derive(Clone, Debug)]
enum FileSource {
    Memory(Arc<[u8]>),
    Disk(PathBuf),
}

/// A regular file.
#[derive(Clone, Debug)]
pub struct FileNode {
    name: String,
    size: u64,
    source: FileSource,
}

impl FileNode {
    pub(crate) fn on_disk(name: String, path: PathBuf, size: u64) -> Self {
        Self {
            name,
            size,
            source: FileSource::Disk(path),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Logical size recorded when the node was created.
    ///
    /// For on-disk files this is the length at enumeration time; the file
    /// may have changed by the time it is read.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The file's bytes.
    pub fn read(&self) -> FsResult<Cow<'_, [u8]>> {
        match &self.source {
            FileSource::Memory(data) => Ok(Cow::Borrowed(data)),
            FileSource::Disk(path) => std::fs::read(path)
                .map(Cow::Owned)
                .map_err(|e| FsError::io(path, e)),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            FileSource::Memory(_) => None,
            FileSource::Disk(path) => Some(path),
        }
    }
}

#[derive(Clone, Debug)]
enum DirSource {
    Memory(Vec<Node>),
    Disk { path: PathBuf, options: WalkOptions },
}

/// A directory.
#[derive(Clone, Debug)]
pub struct DirNode {
    name: String,
    source: DirSource,
}

impl DirNode {
    pub(crate) fn on_disk(name: String, path: PathBuf, options: WalkOptions) -> Self {
        Self {
            name,
            source: DirSource::Disk { path, options },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Immediate children.
    ///
    /// In-memory directories return their children in construction order;
    /// on-disk directories return them sorted by file name. Either way the
    /// listing is fresh on every call.
    pub fn children(&self) -> FsResult<Vec<Node>> {
        match &self.source {
            DirSource::Memory(children) => Ok(children.clone()),
            DirSource::Disk { path, options } => disk::list(path, *options),
        }
    }

    /// Total logical size of every file below this directory.
    pub fn size(&self) -> FsResult<u64> {
        match &self.source {
            DirSource::Memory(children) => children.iter().map(Node::size).sum(),
            DirSource::Disk { path, options } => disk::total_size(path, *options),
        }
    }

    /// A stable identity for cycle detection: the canonical path of an
    /// on-disk directory. In-memory directories cannot form cycles and have
    /// no identity.
    pub fn identity(&self) -> FsResult<Option<PathBuf>> {
        match &self.source {
            DirSource::Memory(_) => Ok(None),
            DirSource::Disk { path, .. } => std::fs::canonicalize(path)
                .map(Some)
                .map_err(|e| FsError::io(path, e)),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            DirSource::Memory(_) => None,
            DirSource::Disk { path, .. } => Some(path),
        }
    }
}
