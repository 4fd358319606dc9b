use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

use crate::error::{FsError, FsResult};
use crate::node::{DirNode, FileNode, Node};

/// How on-disk directories are enumerated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkOptions {
    /// Follow symbolic links. When off, symlinks are skipped.
    pub follow_links: bool,
}

pub(crate) fn open(path: &Path, options: WalkOptions) -> FsResult<Node> {
    let meta = std::fs::metadata(path).map_err(|e| FsError::io(path, e))?;
    let name = match path.file_name() {
        Some(os) => os
            .to_str()
            .ok_or_else(|| FsError::NonUtf8Name(path.to_path_buf()))?
            .to_string(),
        None => String::new(),
    };
    if meta.is_dir() {
        Ok(Node::Directory(DirNode::on_disk(name, path.to_path_buf(), options)))
    } else if meta.is_file() {
        Ok(Node::File(FileNode::on_disk(name, path.to_path_buf(), meta.len())))
    } else {
        Err(FsError::Unsupported(path.to_path_buf()))
    }
}

pub(crate) fn list(path: &Path, options: WalkOptions) -> FsResult<Vec<Node>> {
    let walker = WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .follow_links(options.follow_links)
        .sort_by_file_name();

    let mut nodes = Vec::new();
    for entry in walker {
        let entry = entry?;
        if let Some(node) = entry_to_node(&entry, options)? {
            nodes.push(node);
        }
    }
    Ok(nodes)
}

fn entry_to_node(entry: &DirEntry, options: WalkOptions) -> FsResult<Option<Node>> {
    let path = entry.path();
    let name = entry
        .file_name()
        .to_str()
        .ok_or_else(|| FsError::NonUtf8Name(path.to_path_buf()))?
        .to_string();
    let file_type = entry.file_type();

    if file_type.is_dir() {
        return Ok(Some(Node::Directory(DirNode::on_disk(
            name,
            path.to_path_buf(),
            options,
        ))));
    }
    if file_type.is_file() {
        let meta = entry.metadata()?;
        return Ok(Some(Node::File(FileNode::on_disk(
            name,
            path.to_path_buf(),
            meta.len(),
        ))));
    }
    if file_type.is_symlink() {
        warn!(path = %path.display(), "skipping symbolic link");
    } else {
        warn!(path = %path.display(), "skipping special file");
    }
    Ok(None)
}

pub(crate) fn total_size(path: &Path, options: WalkOptions) -> FsResult<u64> {
    let mut total = 0u64;
    for entry in WalkDir::new(path).follow_links(options.follow_links) {
        let entry = entry?;
        if entry.file_type().is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}
