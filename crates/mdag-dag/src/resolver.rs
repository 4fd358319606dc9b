//! Resolving a root digest and a path back into content.
//!
//! A path is a sequence of entry names separated by `/`. Each segment selects
//! a link of the current tree; what remains when the path runs out is the
//! answer. A single resolution is inherently sequential, since every step
//! needs the digest produced by the previous one, so it is written as a loop
//! over segments and checks the [`CancelToken`] before every fetch. The
//! chunks of a large file are fetched in batches, with a check per batch.

use std::collections::HashMap;

use mdag_crypto::HasherPool;
use mdag_object::{Link, Object, ObjectKind};
use mdag_store::{KvStore, StoreError};
use mdag_types::Digest;
use serde::Serialize;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::config::DagConfig;
use crate::error::{DagError, DagResult};

/// Chunks of one list fetched per store round trip.
const FETCH_BATCH: usize = 64;

/// What lives at a path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Final path segment; empty for the root.
    pub name: String,
    pub kind: ObjectKind,
    pub digest: Digest,
    /// Logical size as recorded by the parent link, or computed for the root.
    pub size: u64,
}

/// Summary of a successful [`Resolver::verify`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    /// Distinct objects reachable from the root.
    pub objects: u64,
    pub chunks: u64,
    pub lists: u64,
    pub trees: u64,
    /// Logical size of the root.
    pub logical_bytes: u64,
    /// Encoded size of every distinct object.
    pub stored_bytes: u64,
}

impl VerifyReport {
    fn record(&mut self, object: &Object, stored: usize) {
        self.objects += 1;
        self.stored_bytes += stored as u64;
        match object.kind() {
            ObjectKind::Chunk => self.chunks += 1,
            ObjectKind::List => self.lists += 1,
            ObjectKind::Tree => self.trees += 1,
        }
    }
}

/// Read-only access to DAGs in a store.
pub struct Resolver<S> {
    store: S,
    hashers: HasherPool,
    verify_reads: bool,
    cancel: CancelToken,
}

/// Resolve `path` under `root` to file content, without re-hashing reads.
pub fn resolve<S: KvStore + ?Sized>(store: &S, root: &Digest, path: &str) -> DagResult<Vec<u8>> {
    Resolver::with_hashers(store, HasherPool::new(Default::default()), false).resolve(root, path)
}

struct Located {
    digest: Digest,
    object: Object,
    size: Option<u64>,
    path: String,
}

impl<S: KvStore> Resolver<S> {
    /// A resolver hashing with `config.hash` and honouring `config.verify_reads`.
    pub fn new(store: S, config: &DagConfig) -> Self {
        Self::with_hashers(store, HasherPool::new(config.hash), config.verify_reads)
    }

    pub fn with_hashers(store: S, hashers: HasherPool, verify_reads: bool) -> Self {
        Self {
            store,
            hashers,
            verify_reads,
            cancel: CancelToken::new(),
        }
    }

    /// Abort traversals once `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// File content at `path` under `root`.
    ///
    /// An empty path resolves `root` itself. Chunked files are reassembled
    /// from their pieces in list order.
    pub fn resolve(&self, root: &Digest, path: &str) -> DagResult<Vec<u8>> {
        let located = self.walk(root, path)?;
        match located.object {
            Object::Chunk(data) => {
                if let Some(size) = located.size {
                    if data.len() as u64 != size {
                        return Err(DagError::corrupt(
                            located.digest,
                            format!("chunk holds {} bytes, link records {size}", data.len()),
                        ));
                    }
                }
                Ok(data)
            }
            Object::List(links) => self.assemble(&located.digest, &links),
            Object::Tree(_) => Err(DagError::IsDirectory {
                path: display(&located.path),
            }),
        }
    }

    /// Digest of the object at `path`, without reading file content.
    pub fn lookup(&self, root: &Digest, path: &str) -> DagResult<Digest> {
        self.walk(root, path).map(|l| l.digest)
    }

    /// Kind, digest and size of the object at `path`.
    pub fn stat(&self, root: &Digest, path: &str) -> DagResult<Entry> {
        let located = self.walk(root, path)?;
        Ok(Entry {
            name: last_segment(&located.path).to_string(),
            kind: located.object.kind(),
            digest: located.digest,
            size: located.size.unwrap_or_else(|| located.object.logical_size()),
        })
    }

    /// Links of the directory at `path`, in name order.
    pub fn list(&self, root: &Digest, path: &str) -> DagResult<Vec<Link>> {
        let located = self.walk(root, path)?;
        match located.object {
            Object::Tree(links) => Ok(links),
            other => Err(DagError::NotADirectory {
                segment: String::new(),
                path: display(&located.path),
                kind: other.kind(),
            }),
        }
    }

    /// Like [`list`](Self::list), with each child's kind.
    ///
    /// A child's kind comes from the header of its stored value. Children
    /// are neither decoded nor re-hashed, so a damaged child still lists;
    /// reading it through [`resolve`](Self::resolve) or
    /// [`stat`](Self::stat) reports the damage.
    pub fn entries(&self, root: &Digest, path: &str) -> DagResult<Vec<Entry>> {
        self.list(root, path)?
            .into_iter()
            .map(|link| {
                self.cancel.check()?;
                let bytes = self
                    .store
                    .get(&link.digest)
                    .map_err(|e| DagError::fetch(link.digest, e))?;
                let kind = Object::peek_kind(&bytes).map_err(|source| DagError::Decode {
                    digest: link.digest,
                    source,
                })?;
                Ok(Entry {
                    name: link.name,
                    kind,
                    digest: link.digest,
                    size: link.size,
                })
            })
            .collect()
    }

    /// Check every object reachable from `root`.
    ///
    /// Each distinct object must be present, decode, hash to its key, and
    /// have the logical size its parent link records. List links must point
    /// at chunks. The first problem found is returned as an error.
    pub fn verify(&self, root: &Digest) -> DagResult<VerifyReport> {
        struct Edge {
            parent: Digest,
            parent_kind: ObjectKind,
            size: u64,
        }

        let mut report = VerifyReport::default();
        let mut seen: HashMap<Digest, (ObjectKind, u64)> = HashMap::new();
        let mut stack: Vec<(Digest, Option<Edge>)> = vec![(*root, None)];

        while let Some((digest, edge)) = stack.pop() {
            let cached = seen.get(&digest).copied();
            let (kind, size) = match cached {
                Some(known) => known,
                None => {
                    let (object, stored) = self.fetch_checked(&digest, true)?;
                    report.record(&object, stored);
                    for link in object.links() {
                        stack.push((
                            link.digest,
                            Some(Edge {
                                parent: digest,
                                parent_kind: object.kind(),
                                size: link.size,
                            }),
                        ));
                    }
                    let known = (object.kind(), object.logical_size());
                    seen.insert(digest, known);
                    known
                }
            };

            if let Some(edge) = edge {
                if edge.parent_kind == ObjectKind::List && kind != ObjectKind::Chunk {
                    return Err(DagError::corrupt(
                        edge.parent,
                        format!("list links {digest}, a {kind}"),
                    ));
                }
                if edge.size != size {
                    return Err(DagError::corrupt(
                        edge.parent,
                        format!("link to {digest} records {} bytes, object holds {size}", edge.size),
                    ));
                }
            }
        }

        report.logical_bytes = seen.get(root).map_or(0, |&(_, size)| size);
        debug!(%root, objects = report.objects, "verified");
        Ok(report)
    }

    fn walk(&self, root: &Digest, path: &str) -> DagResult<Located> {
        let mut digest = *root;
        let mut size = None;
        let mut object = self.fetch(&digest)?;
        let mut walked = String::new();
        let mut rest = path;

        while !rest.is_empty() {
            let (head, tail) = rest.split_once('/').unwrap_or((rest, ""));
            let (next, next_size) = match &object {
                Object::Tree(_) => {
                    let link = object.entry(head).ok_or_else(|| DagError::NoSuchEntry {
                        segment: head.to_string(),
                        parent: display(&walked),
                    })?;
                    (link.digest, link.size)
                }
                other => {
                    return Err(DagError::NotADirectory {
                        segment: head.to_string(),
                        path: display(&walked),
                        kind: other.kind(),
                    })
                }
            };
            walked = join(&walked, head);
            debug!(path = %walked, digest = %next, "resolved segment");
            digest = next;
            size = Some(next_size);
            object = self.fetch(&digest)?;
            rest = tail;
        }

        Ok(Located {
            digest,
            object,
            size,
            path: walked,
        })
    }

    fn assemble(&self, list: &Digest, links: &[Link]) -> DagResult<Vec<u8>> {
        let total: u64 = links.iter().map(|l| l.size).sum();
        let mut out = Vec::with_capacity(usize::try_from(total).unwrap_or(0));
        for window in links.chunks(FETCH_BATCH) {
            self.cancel.check()?;
            let keys: Vec<Digest> = window.iter().map(|l| l.digest).collect();
            let values = self.store.get_batch(&keys).map_err(|e| match e {
                StoreError::NotFound(missing) => DagError::NotFound(missing),
                other => DagError::fetch(*list, other),
            })?;
            for (link, bytes) in window.iter().zip(values) {
                match self.open(&link.digest, &bytes, self.verify_reads)? {
                    Object::Chunk(data) if data.len() as u64 == link.size => {
                        out.extend_from_slice(&data)
                    }
                    Object::Chunk(data) => {
                        return Err(DagError::corrupt(
                            *list,
                            format!(
                                "{} holds {} bytes, link records {}",
                                link.name,
                                data.len(),
                                link.size
                            ),
                        ))
                    }
                    other => {
                        return Err(DagError::corrupt(
                            *list,
                            format!("{} is a {}, not a chunk", link.name, other.kind()),
                        ))
                    }
                }
            }
        }
        Ok(out)
    }

    fn fetch(&self, digest: &Digest) -> DagResult<Object> {
        self.fetch_checked(digest, self.verify_reads).map(|(object, _)| object)
    }

    fn fetch_checked(&self, digest: &Digest, rehash: bool) -> DagResult<(Object, usize)> {
        self.cancel.check()?;
        let bytes = self
            .store
            .get(digest)
            .map_err(|e| DagError::fetch(*digest, e))?;
        let object = self.open(digest, &bytes, rehash)?;
        Ok((object, bytes.len()))
    }

    fn open(&self, digest: &Digest, bytes: &[u8], rehash: bool) -> DagResult<Object> {
        if rehash && !self.hashers.get().verify(bytes, digest) {
            return Err(DagError::corrupt(*digest, "content does not hash to its key"));
        }
        Object::decode(bytes).map_err(|source| DagError::Decode {
            digest: *digest,
            source,
        })
    }
}

impl<S> std::fmt::Debug for Resolver<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("hashers", &self.hashers)
            .field("verify_reads", &self.verify_reads)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

fn display(path: &str) -> String {
    if path.is_empty() {
        ".".to_string()
    } else {
        path.to_string()
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or("")
}
