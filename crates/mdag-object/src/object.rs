use mdag_crypto::ObjectHasher;
use mdag_types::Digest;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{ObjectError, ObjectResult};

/// The kind of a stored object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Raw leaf bytes.
    Chunk,
    /// Ordered links to chunks making up one file.
    List,
    /// Name-sorted links making up one directory.
    Tree,
}

impl ObjectKind {
    /// Tag byte written at the head of the encoding.
    pub fn tag_byte(&self) -> u8 {
        match self {
            Self::Chunk => 1,
            Self::List => 2,
            Self::Tree => 3,
        }
    }

    /// Parse a tag byte.
    pub fn from_tag_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Chunk),
            2 => Some(Self::List),
            3 => Some(Self::Tree),
            _ => None,
        }
    }

    /// Chunks and lists hold file content; trees hold directories.
    pub fn is_file(&self) -> bool {
        matches!(self, Self::Chunk | Self::List)
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chunk => write!(f, "chunk"),
            Self::List => write!(f, "list"),
            Self::Tree => write!(f, "tree"),
        }
    }
}

/// A named, sized reference from a list or tree to a child object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Entry name (file or directory name, or `partN` inside a list).
    pub name: String,
    /// Digest the child is stored under.
    pub digest: Digest,
    /// Logical byte length of the child's content.
    pub size: u64,
}

impl Link {
    pub fn new(name: impl Into<String>, digest: Digest, size: u64) -> Self {
        Self {
            name: name.into(),
            digest,
            size,
        }
    }
}

/// The unit of storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Object {
    /// Raw leaf bytes.
    Chunk(Vec<u8>),
    /// Links to chunks in file order.
    List(Vec<Link>),
    /// Links to children, strictly ascending by name.
    Tree(Vec<Link>),
}

impl Object {
    /// A leaf holding `data`.
    pub fn chunk(data: impl Into<Vec<u8>>) -> Self {
        Self::Chunk(data.into())
    }

    /// A list of chunk links, kept in the order given.
    pub fn list(links: Vec<Link>) -> Self {
        Self::List(links)
    }

    /// A tree of the given links.
    ///
    /// Links are sorted by name so the encoding does not depend on the order
    /// they were collected in. Two links with the same name are rejected.
    pub fn tree(mut links: Vec<Link>) -> ObjectResult<Self> {
        links.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(pair) = links.windows(2).find(|w| w[0].name == w[1].name) {
            return Err(ObjectError::DuplicateName(pair[0].name.clone()));
        }
        Ok(Self::Tree(links))
    }

    /// A tree with no entries.
    pub fn empty_tree() -> Self {
        Self::Tree(Vec::new())
    }

    /// Kind tag of this object.
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Chunk(_) => ObjectKind::Chunk,
            Self::List(_) => ObjectKind::List,
            Self::Tree(_) => ObjectKind::Tree,
        }
    }

    /// Links of a list or tree; empty for a chunk.
    pub fn links(&self) -> &[Link] {
        match self {
            Self::Chunk(_) => &[],
            Self::List(links) | Self::Tree(links) => links,
        }
    }

    /// Look up a tree entry by name.
    pub fn entry(&self, name: &str) -> Option<&Link> {
        match self {
            Self::Tree(links) => links
                .binary_search_by(|l| l.name.as_str().cmp(name))
                .ok()
                .map(|i| &links[i]),
            _ => None,
        }
    }

    /// Payload of a chunk.
    pub fn into_chunk_data(self) -> ObjectResult<Vec<u8>> {
        match self {
            Self::Chunk(data) => Ok(data),
            other => Err(ObjectError::KindMismatch {
                expected: ObjectKind::Chunk,
                actual: other.kind(),
            }),
        }
    }

    /// Logical byte length of the content this object stands for.
    ///
    /// A chunk's payload length; for lists and trees the sum of link sizes.
    pub fn logical_size(&self) -> u64 {
        match self {
            Self::Chunk(data) => data.len() as u64,
            Self::List(links) | Self::Tree(links) => links.iter().map(|l| l.size).sum(),
        }
    }

    /// Canonical encoding.
    pub fn encode(&self) -> Vec<u8> {
        codec::encode(self)
    }

    /// Decode a canonical encoding.
    pub fn decode(bytes: &[u8]) -> ObjectResult<Self> {
        codec::decode(bytes)
    }

    /// Kind of an encoded object without decoding its body.
    pub fn peek_kind(bytes: &[u8]) -> ObjectResult<ObjectKind> {
        codec::peek_kind(bytes)
    }

    /// Digest of the canonical encoding.
    ///
    /// Resets `hasher`, streams the encoding into it and returns the sum.
    /// Large chunk payloads are fed in place rather than copied.
    pub fn digest(&self, hasher: &mut dyn ObjectHasher) -> Digest {
        hasher.reset();
        codec::write(self, &mut |bytes: &[u8]| hasher.update(bytes));
        hasher.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdag_crypto::{Blake3Hasher, HashAlgorithm};

    fn d(n: u8) -> Digest {
        Digest::from_hash([n; 32])
    }

    #[test]
    fn tree_sorts_links_by_name() {
        let tree = Object::tree(vec![
            Link::new("zebra.txt", d(1), 1),
            Link::new("alpha.txt", d(2), 2),
            Link::new("middle", d(3), 3),
        ])
        .unwrap();
        let names: Vec<_> = tree.links().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["alpha.txt", "middle", "zebra.txt"]);
    }

    #[test]
    fn tree_rejects_duplicate_names() {
        let err = Object::tree(vec![Link::new("a", d(1), 1), Link::new("a", d(2), 2)]).unwrap_err();
        assert_eq!(err, ObjectError::DuplicateName("a".into()));
    }

    #[test]
    fn tree_entry_lookup() {
        let tree = Object::tree(vec![Link::new("b", d(2), 2), Link::new("a", d(1), 1)]).unwrap();
        assert_eq!(tree.entry("b").unwrap().digest, d(2));
        assert!(tree.entry("c").is_none());
        assert!(Object::chunk(b"x".to_vec()).entry("a").is_none());
    }

    #[test]
    fn empty_list_tree_and_chunk_are_distinct() {
        let mut h = Blake3Hasher::new();
        let chunk = Object::chunk(Vec::new()).digest(&mut h);
        let list = Object::list(Vec::new()).digest(&mut h);
        let tree = Object::empty_tree().digest(&mut h);
        assert_ne!(chunk, list);
        assert_ne!(chunk, tree);
        assert_ne!(list, tree);
    }

    #[test]
    fn digest_is_hash_of_encoding() {
        let obj = Object::tree(vec![Link::new("file", d(9), 42)]).unwrap();
        for algo in [HashAlgorithm::Blake3, HashAlgorithm::Sha256] {
            let mut h = algo.hasher();
            let streamed = obj.digest(h.as_mut());
            let direct = h.digest(&obj.encode());
            assert_eq!(streamed, direct);
        }
    }

    #[test]
    fn digest_ignores_hasher_leftovers() {
        let mut h = Blake3Hasher::new();
        let clean = Object::chunk(b"data".to_vec()).digest(&mut h);
        h.update(b"stale input");
        assert_eq!(Object::chunk(b"data".to_vec()).digest(&mut h), clean);
    }

    #[test]
    fn kind_serializes_like_its_display() {
        for kind in [ObjectKind::Chunk, ObjectKind::List, ObjectKind::Tree] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
            assert_eq!(serde_json::from_str::<ObjectKind>(&json).unwrap(), kind);
        }
    }

    #[test]
    fn logical_size_sums_links() {
        assert_eq!(Object::chunk(vec![0u8; 7]).logical_size(), 7);
        let list = Object::list(vec![Link::new("part0", d(1), 4), Link::new("part1", d(2), 3)]);
        assert_eq!(list.logical_size(), 7);
        assert_eq!(Object::empty_tree().logical_size(), 0);
    }

    #[test]
    fn into_chunk_data_checks_kind() {
        assert_eq!(Object::chunk(b"abc".to_vec()).into_chunk_data().unwrap(), b"abc");
        let err = Object::empty_tree().into_chunk_data().unwrap_err();
        assert_eq!(
            err,
            ObjectError::KindMismatch {
                expected: ObjectKind::Chunk,
                actual: ObjectKind::Tree
            }
        );
    }

    #[test]
    fn kind_tag_roundtrip() {
        for kind in [ObjectKind::Chunk, ObjectKind::List, ObjectKind::Tree] {
            assert_eq!(ObjectKind::from_tag_byte(kind.tag_byte()), Some(kind));
        }
        assert!(ObjectKind::from_tag_byte(0).is_none());
        assert!(ObjectKind::from_tag_byte(4).is_none());
    }

    #[test]
    fn kind_display() {
        assert_eq!(ObjectKind::Chunk.to_string(), "chunk");
        assert_eq!(ObjectKind::List.to_string(), "list");
        assert_eq!(ObjectKind::Tree.to_string(), "tree");
    }
}
