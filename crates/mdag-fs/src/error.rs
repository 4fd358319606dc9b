use std::path::PathBuf;

/// Errors from reading a filesystem tree.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// I/O error while reading a file or listing a directory.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file or directory name is not valid UTF-8.
    #[error("name is not valid UTF-8: {0}")]
    NonUtf8Name(PathBuf),

    /// Following a symlink leads back to one of its own ancestors.
    #[error("filesystem loop: {path} points back to {ancestor}")]
    Loop { path: PathBuf, ancestor: PathBuf },

    /// The root path is neither a regular file nor a directory.
    #[error("unsupported file type at {0}")]
    Unsupported(PathBuf),
}

impl FsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<walkdir::Error> for FsError {
    fn from(e: walkdir::Error) -> Self {
        if let (Some(path), Some(ancestor)) = (e.path(), e.loop_ancestor()) {
            return Self::Loop {
                path: path.to_path_buf(),
                ancestor: ancestor.to_path_buf(),
            };
        }
        let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();
        Self::io(path, e.into())
    }
}

/// Result alias for filesystem tree operations.
pub type FsResult<T> = Result<T, FsError>;
