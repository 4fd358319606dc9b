//! Splitting file content into chunk objects.

use std::ops::Range;

use mdag_crypto::ObjectHasher;
use mdag_object::{Link, Object, ObjectKind};
use mdag_store::KvStore;
use mdag_types::Digest;
use tracing::debug;

use crate::error::{DagError, DagResult};

/// Name of the `index`th piece of a chunked file: `part0`, `part1`, ...
pub fn part_name(index: usize) -> String {
    format!("part{index}")
}

/// Splits file content at fixed boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
}

/// Result of writing one file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WrittenFile {
    /// Digest of the chunk or list that stands for the file.
    pub digest: Digest,
    /// Chunk for small files, list for split ones.
    pub kind: ObjectKind,
    /// Logical byte length.
    pub size: u64,
    /// Number of objects written, including the list.
    pub objects: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize) -> DagResult<Self> {
        if chunk_size == 0 {
            return Err(DagError::InvalidConfig("chunk_size must be positive".into()));
        }
        Ok(Self { chunk_size })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Byte ranges of the pieces a file of `len` bytes is split into.
    ///
    /// A file of at most `chunk_size` bytes (including an empty one) is a
    /// single range. Otherwise every range is `chunk_size` long except the
    /// last, which holds the remaining `1..=chunk_size` bytes.
    pub fn boundaries(&self, len: usize) -> Vec<Range<usize>> {
        if len <= self.chunk_size {
            return vec![0..len];
        }
        (0..len)
            .step_by(self.chunk_size)
            .map(|start| start..len.min(start + self.chunk_size))
            .collect()
    }

    /// Store `data` as the content of the file at `path`.
    ///
    /// `declared` is the size the file reported before it was read; a
    /// different number of bytes means the file changed underneath us.
    /// Every chunk is stored before the list that links it.
    pub fn write<S: KvStore + ?Sized>(
        &self,
        store: &S,
        path: &str,
        declared: u64,
        data: &[u8],
        hasher: &mut dyn ObjectHasher,
    ) -> DagResult<WrittenFile> {
        if data.len() as u64 != declared {
            return Err(DagError::SizeMismatch {
                path: path.to_string(),
                expected: declared,
                actual: data.len() as u64,
            });
        }

        if data.len() <= self.chunk_size {
            let digest = persist(store, path, &Object::chunk(data), hasher)?;
            return Ok(WrittenFile {
                digest,
                kind: ObjectKind::Chunk,
                size: declared,
                objects: 1,
            });
        }

        let ranges = self.boundaries(data.len());
        let mut links = Vec::with_capacity(ranges.len());
        for (i, range) in ranges.into_iter().enumerate() {
            let size = range.len() as u64;
            let digest = persist(store, path, &Object::chunk(&data[range]), hasher)?;
            links.push(Link::new(part_name(i), digest, size));
        }
        let objects = links.len() + 1;
        let digest = persist(store, path, &Object::list(links), hasher)?;
        Ok(WrittenFile {
            digest,
            kind: ObjectKind::List,
            size: declared,
            objects,
        })
    }
}

/// Encode, hash and store one object on behalf of the entry at `path`.
pub(crate) fn persist<S: KvStore + ?Sized>(
    store: &S,
    path: &str,
    object: &Object,
    hasher: &mut dyn ObjectHasher,
) -> DagResult<Digest> {
    let bytes = object.encode();
    let digest = hasher.digest(&bytes);
    store.put(&digest, &bytes).map_err(|source| DagError::Persist {
        path: path.to_string(),
        source,
    })?;
    debug!(%digest, kind = %object.kind(), len = bytes.len(), path, "stored object");
    Ok(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdag_crypto::Blake3Hasher;
    use mdag_store::InMemoryKvStore;

    const T: usize = 4;

    fn chunker() -> Chunker {
        Chunker::new(T).unwrap()
    }

    fn stored(store: &InMemoryKvStore, digest: &Digest) -> Object {
        Object::decode(&store.get(digest).unwrap()).unwrap()
    }

    #[test]
    fn zero_chunk_size_rejected() {
        assert!(matches!(Chunker::new(0), Err(DagError::InvalidConfig(_))));
    }

    #[test]
    fn boundaries_at_threshold_edges() {
        let c = chunker();
        assert_eq!(c.boundaries(0), vec![0..0]);
        assert_eq!(c.boundaries(3), vec![0..3]);
        assert_eq!(c.boundaries(T), vec![0..4]);
        assert_eq!(c.boundaries(T + 1), vec![0..4, 4..5]);
        assert_eq!(c.boundaries(2 * T + 1), vec![0..4, 4..8, 8..9]);
        assert_eq!(c.boundaries(3 * T), vec![0..4, 4..8, 8..12]);
    }

    #[test]
    fn part_names_are_decimal() {
        assert_eq!(part_name(0), "part0");
        assert_eq!(part_name(9), "part9");
        assert_eq!(part_name(10), "part10");
        assert_eq!(part_name(123), "part123");
    }

    #[test]
    fn empty_file_is_one_empty_chunk() {
        let store = InMemoryKvStore::new();
        let w = chunker()
            .write(&store, "e", 0, b"", &mut Blake3Hasher::new())
            .unwrap();
        assert_eq!(w.kind, ObjectKind::Chunk);
        assert_eq!(w.objects, 1);
        assert_eq!(stored(&store, &w.digest), Object::chunk(Vec::new()));
    }

    #[test]
    fn file_at_threshold_is_one_chunk() {
        let store = InMemoryKvStore::new();
        let w = chunker()
            .write(&store, "f", 4, b"abcd", &mut Blake3Hasher::new())
            .unwrap();
        assert_eq!(w.kind, ObjectKind::Chunk);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn large_file_becomes_list_of_parts() {
        let store = InMemoryKvStore::new();
        let data = b"abcdefghi";
        let w = chunker()
            .write(&store, "f", 9, data, &mut Blake3Hasher::new())
            .unwrap();
        assert_eq!(w.kind, ObjectKind::List);
        assert_eq!(w.objects, 4);
        assert_eq!(w.size, 9);

        let list = stored(&store, &w.digest);
        let links = list.links();
        assert_eq!(links.len(), 3);
        let names: Vec<_> = links.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["part0", "part1", "part2"]);
        let sizes: Vec<_> = links.iter().map(|l| l.size).collect();
        assert_eq!(sizes, [4, 4, 1]);

        let mut joined = Vec::new();
        for link in links {
            joined.extend(stored(&store, &link.digest).into_chunk_data().unwrap());
        }
        assert_eq!(joined, data);
    }

    #[test]
    fn repeated_pieces_are_stored_once() {
        let store = InMemoryKvStore::new();
        let w = chunker()
            .write(&store, "f", 12, b"xxxxxxxxxxxx", &mut Blake3Hasher::new())
            .unwrap();
        let links = stored(&store, &w.digest).links().to_vec();
        assert_eq!(links.len(), 3);
        assert!(links.iter().all(|l| l.digest == links[0].digest));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn writing_twice_changes_nothing() {
        let store = InMemoryKvStore::new();
        let c = chunker();
        let first = c.write(&store, "f", 10, b"0123456789", &mut Blake3Hasher::new()).unwrap();
        let keys = store.keys();
        let second = c.write(&store, "f", 10, b"0123456789", &mut Blake3Hasher::new()).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.keys(), keys);
    }

    #[test]
    fn size_mismatch_names_the_file() {
        let store = InMemoryKvStore::new();
        let err = chunker()
            .write(&store, "dir/grown.txt", 3, b"abcd", &mut Blake3Hasher::new())
            .unwrap_err();
        match err {
            DagError::SizeMismatch {
                path,
                expected,
                actual,
            } => {
                assert_eq!(path, "dir/grown.txt");
                assert_eq!((expected, actual), (3, 4));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.is_empty());
    }
}
