//! On-disk loose-object store.
//!
//! Every value lives in its own file under a two-level fan-out directory,
//! like git's `.git/objects/`:
//!
//! ```text
//! <root>/ab/cdef0123...   (remaining 62 hex characters of the key)
//! ```
//!
//! Each file starts with one encoding byte (`0` raw, `1` zstd) followed by
//! the payload, so compressed and uncompressed values can coexist in one
//! store. Writes go through a temporary file in the target directory and are
//! renamed into place, so readers never observe a partially written value.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use mdag_types::Digest;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::KvStore;

const RAW: u8 = 0;
const ZSTD: u8 = 1;

/// Configuration for [`FsKvStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsStoreConfig {
    /// Compress values with zstd before writing them.
    pub compress: bool,
    /// zstd compression level.
    pub level: i32,
}

impl Default for FsStoreConfig {
    fn default() -> Self {
        Self {
            compress: false,
            level: 3,
        }
    }
}

/// Key-value store backed by a directory of loose files.
#[derive(Debug)]
pub struct FsKvStore {
    root: PathBuf,
    config: FsStoreConfig,
    read_only: bool,
}

impl FsKvStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>, config: FsStoreConfig) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
        Ok(Self {
            root,
            config,
            read_only: false,
        })
    }

    /// Open an existing store for reading. Every `put` fails with
    /// [`StoreError::ReadOnly`].
    pub fn open_read_only(root: impl AsRef<Path>, config: FsStoreConfig) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        let meta = fs::metadata(&root).map_err(|e| StoreError::io(&root, e))?;
        if !meta.is_dir() {
            return Err(StoreError::io(
                &root,
                std::io::Error::other("store root is not a directory"),
            ));
        }
        Ok(Self {
            root,
            config,
            read_only: true,
        })
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Directory this store writes into.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `key`.
    pub fn path_for(&self, key: &Digest) -> PathBuf {
        let hex = key.to_hex();
        self.root.join(&hex[..2]).join(&hex[2..])
    }

    /// Sorted list of every key in the store.
    ///
    /// Files whose names do not form a valid key (temporary files left by a
    /// crash, stray files) are skipped.
    pub fn keys(&self) -> StoreResult<Vec<Digest>> {
        let mut keys = Vec::new();
        for entry in walkdir::WalkDir::new(&self.root).min_depth(2).max_depth(2) {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
                StoreError::io(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let prefix = entry
                .path()
                .parent()
                .and_then(Path::file_name)
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            let rest = entry.file_name().to_str().unwrap_or_default();
            if let Ok(key) = Digest::from_hex(&format!("{prefix}{rest}")) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn encode_value(&self, key: &Digest, value: &[u8]) -> StoreResult<Vec<u8>> {
        if !self.config.compress {
            let mut out = Vec::with_capacity(value.len() + 1);
            out.push(RAW);
            out.extend_from_slice(value);
            return Ok(out);
        }
        let mut out = vec![ZSTD];
        let compressed =
            zstd::encode_all(value, self.config.level).map_err(|e| StoreError::Compression {
                key: *key,
                reason: e.to_string(),
            })?;
        out.extend_from_slice(&compressed);
        Ok(out)
    }

    fn decode_value(key: &Digest, raw: Vec<u8>) -> StoreResult<Vec<u8>> {
        match raw.split_first() {
            Some((&RAW, payload)) => Ok(payload.to_vec()),
            Some((&ZSTD, payload)) => {
                zstd::decode_all(payload).map_err(|e| StoreError::Compression {
                    key: *key,
                    reason: e.to_string(),
                })
            }
            Some((other, _)) => Err(StoreError::Compression {
                key: *key,
                reason: format!("unknown value encoding byte {other}"),
            }),
            None => Err(StoreError::Compression {
                key: *key,
                reason: "empty value file".to_string(),
            }),
        }
    }
}

impl KvStore for FsKvStore {
    /// Existing files are trusted and left untouched: the key is the digest
    /// of the value, so re-reading it to compare would only detect tampering,
    /// which resolution checks for anyway.
    fn put(&self, key: &Digest, value: &[u8]) -> StoreResult<()> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        let path = self.path_for(key);
        if path.exists() {
            return Ok(());
        }
        let dir = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

        let encoded = self.encode_value(key, value)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
        tmp.write_all(&encoded)
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| StoreError::io(&path, e.error))?;

        debug!(key = %key.short_hex(), bytes = value.len(), "stored value");
        Ok(())
    }

    fn get(&self, key: &Digest) -> StoreResult<Vec<u8>> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(raw) => Self::decode_value(key, raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound(*key)),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    fn contains(&self, key: &Digest) -> StoreResult<bool> {
        Ok(self.path_for(key).is_file())
    }
}
