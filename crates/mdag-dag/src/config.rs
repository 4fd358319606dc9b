use std::num::NonZeroUsize;

use mdag_crypto::HashAlgorithm;
use serde::{Deserialize, Serialize};

use crate::error::{DagError, DagResult};

/// Default chunk size: 256 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Settings shared by the builder and the resolver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DagConfig {
    /// Files larger than this are split into pieces of this size.
    pub chunk_size: usize,
    /// Hash function for object digests.
    pub hash: HashAlgorithm,
    /// Worker threads used to build sibling subtrees. `1` builds on the
    /// calling thread.
    pub workers: usize,
    /// Maximum nesting below the root node, if limited.
    pub max_depth: Option<usize>,
    /// Re-hash every object read from the store and compare it to its key.
    pub verify_reads: bool,
}

impl Default for DagConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            hash: HashAlgorithm::default(),
            workers: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            max_depth: None,
            verify_reads: true,
        }
    }
}

impl DagConfig {
    /// Reject settings no build could run with.
    pub fn validate(&self) -> DagResult<()> {
        if self.chunk_size == 0 {
            return Err(DagError::InvalidConfig("chunk_size must be positive".into()));
        }
        if self.workers == 0 {
            return Err(DagError::InvalidConfig("workers must be positive".into()));
        }
        Ok(())
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_hash(mut self, hash: HashAlgorithm) -> Self {
        self.hash = hash;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_verify_reads(mut self, verify_reads: bool) -> Self {
        self.verify_reads = verify_reads;
        self
    }
}
