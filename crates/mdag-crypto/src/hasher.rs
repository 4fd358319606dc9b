use std::fmt;
use std::str::FromStr;

use mdag_types::Digest;
use serde::{Deserialize, Serialize};
use sha2::Digest as _;

/// A resettable digest computation unit.
///
/// A hasher is stateful: `reset`, then any number of `update` calls, then
/// `finalize`. It must never be shared between concurrent computations;
/// each unit of work borrows its own from a [`HasherPool`](crate::HasherPool).
pub trait ObjectHasher: Send {
    /// Discard any buffered input.
    fn reset(&mut self);

    /// Feed bytes into the running hash.
    fn update(&mut self, data: &[u8]);

    /// Produce the digest of everything fed since the last reset.
    ///
    /// The hasher is left reset afterwards, ready for the next computation.
    fn finalize(&mut self) -> Digest;

    /// Which algorithm this hasher computes.
    fn algorithm(&self) -> HashAlgorithm;

    /// A new, empty hasher of the same algorithm.
    fn fresh(&self) -> Box<dyn ObjectHasher>;

    /// Reset, feed `data`, finalize.
    fn digest(&mut self, data: &[u8]) -> Digest {
        self.reset();
        self.update(data);
        self.finalize()
    }

    /// Verify that `data` hashes to `expected`.
    fn verify(&mut self, data: &[u8], expected: &Digest) -> bool {
        self.digest(data) == *expected
    }
}

/// Hash algorithms available for content addressing.
///
/// Both produce 32-byte digests. The choice is part of the digest domain:
/// a tree built with one algorithm cannot be resolved with the other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Blake3,
    Sha256,
}

impl HashAlgorithm {
    /// Construct an empty hasher for this algorithm.
    pub fn hasher(self) -> Box<dyn ObjectHasher> {
        match self {
            Self::Blake3 => Box::new(Blake3Hasher::new()),
            Self::Sha256 => Box::new(Sha256Hasher::new()),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blake3 => write!(f, "blake3"),
            Self::Sha256 => write!(f, "sha256"),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = HasherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blake3" => Ok(Self::Blake3),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            other => Err(HasherError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// BLAKE3 hasher.
#[derive(Clone, Default)]
pub struct Blake3Hasher {
    inner: blake3::Hasher,
}

impl Blake3Hasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectHasher for Blake3Hasher {
    fn reset(&mut self) {
        self.inner.reset();
    }

    fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    fn finalize(&mut self) -> Digest {
        let out = Digest::from_hash(*self.inner.finalize().as_bytes());
        self.inner.reset();
        out
    }

    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Blake3
    }

    fn fresh(&self) -> Box<dyn ObjectHasher> {
        Box::new(Self::new())
    }
}

/// SHA-256 hasher.
#[derive(Clone, Default)]
pub struct Sha256Hasher {
    inner: sha2::Sha256,
}

impl Sha256Hasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectHasher for Sha256Hasher {
    fn reset(&mut self) {
        sha2::Digest::reset(&mut self.inner);
    }

    fn update(&mut self, data: &[u8]) {
        sha2::Digest::update(&mut self.inner, data);
    }

    fn finalize(&mut self) -> Digest {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.inner.finalize_reset());
        Digest::from_hash(out)
    }

    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha256
    }

    fn fresh(&self) -> Box<dyn ObjectHasher> {
        Box::new(Self::new())
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("unknown hash algorithm: {0}")]
    UnknownAlgorithm(String),
}
