//! Building a Merkle DAG from a filesystem tree.
//!
//! Objects are written bottom-up: a file's chunks before its list, and every
//! child before the tree that links it. A tree's digest therefore always
//! refers to objects that are already in the store.
//!
//! With more than one worker, sibling entries of a directory are built in
//! parallel on a dedicated `rayon` pool. Each unit of work takes its own
//! hasher from the [`HasherPool`]; nothing else is shared but the store.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use mdag_crypto::HasherPool;
use mdag_fs::{DirNode, FileNode, Node};
use mdag_object::{Link, Object, ObjectError, ObjectKind};
use mdag_store::KvStore;
use mdag_types::Digest;
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, info};

use crate::chunker::{persist, Chunker};
use crate::config::DagConfig;
use crate::error::{DagError, DagResult};

/// Counters collected during one build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub files: u64,
    pub directories: u64,
    /// Objects handed to the store, including ones it already held.
    pub objects: u64,
    /// Logical bytes of file content.
    pub bytes: u64,
}

/// Root of a completed build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildOutput {
    pub root: Digest,
    pub kind: ObjectKind,
    /// Logical size of the whole tree.
    pub size: u64,
    pub stats: BuildStats,
}

/// Builds DAGs into a store.
///
/// ```ignore
/// let builder = DagBuilder::new(InMemoryKvStore::new(), DagConfig::default())?;
/// let root = builder.add(&Node::from_path("docs")?)?;
/// ```
pub struct DagBuilder<S> {
    store: S,
    config: DagConfig,
    hashers: HasherPool,
    pool: Option<ThreadPool>,
}

impl<S: KvStore> DagBuilder<S> {
    /// Validate `config` and prepare a builder hashing with `config.hash`.
    pub fn new(store: S, config: DagConfig) -> DagResult<Self> {
        let hashers = HasherPool::new(config.hash);
        Self::with_hashers(store, config, hashers)
    }

    /// Like [`new`](Self::new), with an injected hasher pool. The pool's
    /// algorithm takes precedence over `config.hash`.
    pub fn with_hashers(store: S, config: DagConfig, hashers: HasherPool) -> DagResult<Self> {
        config.validate()?;
        let pool = worker_pool(config.workers)?;
        Ok(Self {
            store,
            config,
            hashers,
            pool,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &DagConfig {
        &self.config
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Build `node` and return its digest.
    pub fn add(&self, node: &Node) -> DagResult<Digest> {
        self.build(node).map(|out| out.root)
    }

    /// Build `node` and return its digest together with build statistics.
    pub fn build(&self, node: &Node) -> DagResult<BuildOutput> {
        run(
            &self.store,
            node,
            &self.hashers,
            &self.config,
            self.pool.as_ref(),
        )
    }
}

impl<S> std::fmt::Debug for DagBuilder<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DagBuilder")
            .field("config", &self.config)
            .field("hashers", &self.hashers)
            .finish_non_exhaustive()
    }
}

/// Build `node` into `store` and return its digest.
///
/// Hashers come from `hashers`; `config.hash` is not consulted. With
/// `config.workers > 1` a worker pool is created for this call.
pub fn add<S: KvStore + ?Sized>(
    store: &S,
    node: &Node,
    hashers: &HasherPool,
    config: &DagConfig,
) -> DagResult<Digest> {
    config.validate()?;
    let pool = worker_pool(config.workers)?;
    run(store, node, hashers, config, pool.as_ref()).map(|out| out.root)
}

fn worker_pool(workers: usize) -> DagResult<Option<ThreadPool>> {
    if workers <= 1 {
        return Ok(None);
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("mdag-build-{i}"))
        .build()
        .map(Some)
        .map_err(|e| DagError::InvalidConfig(format!("cannot start {workers} workers: {e}")))
}

fn run<S: KvStore + ?Sized>(
    store: &S,
    node: &Node,
    hashers: &HasherPool,
    config: &DagConfig,
    pool: Option<&ThreadPool>,
) -> DagResult<BuildOutput> {
    let started = Instant::now();
    let build = Build {
        store,
        hashers,
        chunker: Chunker::new(config.chunk_size)?,
        max_depth: config.max_depth,
        parallel: pool.is_some(),
        counters: Counters::default(),
    };
    let root = Ancestry::root();
    let built = match pool {
        Some(pool) => pool.install(|| build.node(node, "", 0, &root)),
        None => build.node(node, "", 0, &root),
    }?;
    let stats = build.counters.snapshot();
    info!(
        root = %built.digest,
        kind = %built.kind,
        size = built.size,
        files = stats.files,
        directories = stats.directories,
        objects = stats.objects,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "build complete"
    );
    Ok(BuildOutput {
        root: built.digest,
        kind: built.kind,
        size: built.size,
        stats,
    })
}

#[derive(Default)]
struct Counters {
    files: AtomicU64,
    directories: AtomicU64,
    objects: AtomicU64,
    bytes: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> BuildStats {
        BuildStats {
            files: self.files.load(Ordering::Relaxed),
            directories: self.directories.load(Ordering::Relaxed),
            objects: self.objects.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }
}

/// Canonical paths of the on-disk directories being built above a node.
struct Ancestry<'a> {
    id: Option<PathBuf>,
    parent: Option<&'a Ancestry<'a>>,
}

impl<'a> Ancestry<'a> {
    fn root() -> Self {
        Self {
            id: None,
            parent: None,
        }
    }

    fn child(&'a self, id: Option<PathBuf>) -> Self {
        Self {
            id,
            parent: Some(self),
        }
    }

    fn contains(&self, id: &Path) -> bool {
        let mut cur = Some(self);
        while let Some(a) = cur {
            if a.id.as_deref() == Some(id) {
                return true;
            }
            cur = a.parent;
        }
        false
    }
}

struct Built {
    digest: Digest,
    kind: ObjectKind,
    size: u64,
}

struct Build<'a, S: ?Sized> {
    store: &'a S,
    hashers: &'a HasherPool,
    chunker: Chunker,
    max_depth: Option<usize>,
    parallel: bool,
    counters: Counters,
}

impl<S: KvStore + ?Sized> Build<'_, S> {
    fn node(&self, node: &Node, path: &str, depth: usize, ancestry: &Ancestry<'_>) -> DagResult<Built> {
        if let Some(limit) = self.max_depth {
            if depth > limit {
                return Err(DagError::DepthExceeded {
                    path: display(path),
                    limit,
                });
            }
        }
        match node {
            Node::File(file) => self.file(file, path),
            Node::Directory(dir) => self.dir(dir, path, depth, ancestry),
        }
    }

    fn file(&self, file: &FileNode, path: &str) -> DagResult<Built> {
        let data = file.read().map_err(|e| DagError::fs(&display(path), e))?;
        let mut hasher = self.hashers.get();
        let written = self
            .chunker
            .write(self.store, &display(path), file.size(), &data, &mut *hasher)?;

        self.counters.files.fetch_add(1, Ordering::Relaxed);
        self.counters
            .objects
            .fetch_add(written.objects as u64, Ordering::Relaxed);
        self.counters.bytes.fetch_add(written.size, Ordering::Relaxed);
        Ok(Built {
            digest: written.digest,
            kind: written.kind,
            size: written.size,
        })
    }

    fn dir(&self, dir: &DirNode, path: &str, depth: usize, ancestry: &Ancestry<'_>) -> DagResult<Built> {
        let here = display(path);
        let id = dir.identity().map_err(|e| DagError::fs(&here, e))?;
        if let Some(id) = &id {
            if ancestry.contains(id) {
                return Err(DagError::CycleDetected { path: here });
            }
        }
        let ancestry = ancestry.child(id);

        let mut children = dir.children().map_err(|e| DagError::fs(&here, e))?;
        children.sort_by(|a, b| a.name().cmp(b.name()));
        for (i, child) in children.iter().enumerate() {
            let name = child.name();
            if name.is_empty() || name.contains('/') {
                return Err(DagError::InvalidName {
                    dir: here,
                    name: name.to_string(),
                });
            }
            if i > 0 && children[i - 1].name() == name {
                return Err(DagError::DuplicateEntry {
                    dir: here,
                    name: name.to_string(),
                });
            }
        }

        let link = |child: &Node| -> DagResult<Link> {
            let child_path = join(path, child.name());
            let built = self.node(child, &child_path, depth + 1, &ancestry)?;
            Ok(Link::new(child.name(), built.digest, built.size))
        };
        let links = if self.parallel {
            children.par_iter().map(link).collect::<DagResult<Vec<_>>>()?
        } else {
            children.iter().map(link).collect::<DagResult<Vec<_>>>()?
        };

        let size = links.iter().map(|l| l.size).sum();
        let tree = Object::tree(links).map_err(|e| match e {
            ObjectError::DuplicateName(name) => DagError::DuplicateEntry {
                dir: here.clone(),
                name,
            },
            other => DagError::InvalidName {
                dir: here.clone(),
                name: other.to_string(),
            },
        })?;
        let digest = {
            let mut hasher = self.hashers.get();
            persist(self.store, &here, &tree, &mut *hasher)?
        };
        debug!(path = %here, %digest, entries = tree.links().len(), "built directory");

        self.counters.directories.fetch_add(1, Ordering::Relaxed);
        self.counters.objects.fetch_add(1, Ordering::Relaxed);
        Ok(Built {
            digest,
            kind: ObjectKind::Tree,
            size,
        })
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use mdag_crypto::HashAlgorithm;
    use mdag_store::InMemoryKvStore;

    fn config() -> DagConfig {
        DagConfig::default().with_chunk_size(4).with_workers(1)
    }

    fn builder(config: DagConfig) -> DagBuilder<InMemoryKvStore> {
        DagBuilder::new(InMemoryKvStore::new(), config).unwrap()
    }

    fn fetch(store: &InMemoryKvStore, digest: &Digest) -> Object {
        Object::decode(&store.get(digest).unwrap()).unwrap()
    }

    fn sample() -> Node {
        Node::dir(
            "root",
            vec![
                Node::file("z.txt", b"last".to_vec()),
                Node::dir("docs", vec![Node::file("big.bin", b"0123456789".to_vec())]),
                Node::file("a.txt", b"hi".to_vec()),
            ],
        )
    }

    #[test]
    fn tree_links_sorted_with_logical_sizes() {
        let b = builder(config());
        let out = b.build(&sample()).unwrap();
        assert_eq!(out.kind, ObjectKind::Tree);
        assert_eq!(out.size, 16);

        let tree = fetch(b.store(), &out.root);
        let names: Vec<_> = tree.links().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["a.txt", "docs", "z.txt"]);
        let sizes: Vec<_> = tree.links().iter().map(|l| l.size).collect();
        assert_eq!(sizes, [2, 10, 4]);

        let docs = fetch(b.store(), &tree.links()[1].digest);
        assert_eq!(docs.kind(), ObjectKind::Tree);
        let big = fetch(b.store(), &docs.links()[0].digest);
        assert_eq!(big.kind(), ObjectKind::List);
    }

    #[test]
    fn directory_link_size_matches_node_size() {
        let node = sample();
        let b = builder(config());
        let out = b.build(&node).unwrap();
        assert_eq!(out.size, node.size().unwrap());
    }

    #[test]
    fn stats_count_every_object() {
        let out = builder(config()).build(&sample()).unwrap();
        // 2 small files, 3 chunks + 1 list, 2 trees
        assert_eq!(out.stats.objects, 8);
        assert_eq!(out.stats.files, 3);
        assert_eq!(out.stats.directories, 2);
        assert_eq!(out.stats.bytes, 16);
    }

    #[test]
    fn empty_directory_is_empty_tree() {
        let b = builder(config());
        let root = b.add(&Node::dir("e", vec![])).unwrap();
        assert_eq!(fetch(b.store(), &root), Object::empty_tree());
    }

    #[test]
    fn root_file_is_stored_directly() {
        let b = builder(config());
        let root = b.add(&Node::file("f", b"abc".to_vec())).unwrap();
        assert_eq!(fetch(b.store(), &root), Object::chunk(b"abc".to_vec()));
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let seq = builder(config()).add(&sample()).unwrap();
        let par = builder(config().with_workers(4)).add(&sample()).unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn hash_algorithm_changes_digest() {
        let blake = builder(config()).add(&sample()).unwrap();
        let sha = builder(config().with_hash(HashAlgorithm::Sha256))
            .add(&sample())
            .unwrap();
        assert_ne!(blake, sha);
    }

    #[test]
    fn free_function_uses_injected_hashers() {
        let store = InMemoryKvStore::new();
        let hashers = HasherPool::new(HashAlgorithm::Blake3);
        let via_fn = add(&store, &sample(), &hashers, &config()).unwrap();
        assert_eq!(via_fn, builder(config()).add(&sample()).unwrap());
        assert!(hashers.idle() >= 1);
    }

    #[test]
    fn invalid_names_rejected() {
        for bad in ["", "a/b"] {
            let node = Node::dir("root", vec![Node::dir("sub", vec![Node::file(bad, b"x".to_vec())])]);
            let err = builder(config()).add(&node).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
            assert!(matches!(&err, DagError::InvalidName { dir, .. } if dir == "sub"), "{err:?}");
        }
    }

    #[test]
    fn duplicate_siblings_rejected() {
        let node = Node::dir(
            "root",
            vec![Node::file("same", b"1".to_vec()), Node::dir("same", vec![])],
        );
        let err = builder(config()).add(&node).unwrap_err();
        assert!(matches!(&err, DagError::DuplicateEntry { dir, name } if dir == "." && name == "same"));
    }

    #[test]
    fn depth_limit_enforced() {
        let node = Node::dir("r", vec![Node::dir("a", vec![Node::dir("b", vec![])])]);
        assert!(builder(config().with_max_depth(2)).add(&node).is_ok());
        let err = builder(config().with_max_depth(1)).add(&node).unwrap_err();
        assert!(matches!(&err, DagError::DepthExceeded { path, limit: 1 } if path == "a/b"));
    }

    #[test]
    fn invalid_config_rejected() {
        let err = DagBuilder::new(InMemoryKvStore::new(), config().with_chunk_size(0)).unwrap_err();
        assert!(matches!(err, DagError::InvalidConfig(_)));
    }
}
