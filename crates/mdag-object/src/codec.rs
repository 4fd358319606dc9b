//! Canonical binary encoding of objects.
//!
//! All integers are big-endian and every variable-length field is length
//! prefixed, so the encoding of an object is unique:
//!
//! ```text
//! object := version:u8 kind:u8 body
//! chunk  := len:u64 bytes[len]
//! list   := count:u64 link*count
//! tree   := count:u64 link*count        names strictly ascending
//! link   := name_len:u64 name[name_len] digest:[u8; 32] size:u64
//! ```

use bytes::{Buf, BufMut};
use mdag_types::{Digest, DIGEST_LEN};

use crate::error::{ObjectError, ObjectResult};
use crate::object::{Link, Object, ObjectKind};

/// Version byte written at the head of every encoding.
pub const FORMAT_VERSION: u8 = 1;

/// Stream the canonical encoding of `obj` into `sink`, segment by segment.
pub(crate) fn write(obj: &Object, sink: &mut dyn FnMut(&[u8])) {
    sink(&[FORMAT_VERSION, obj.kind().tag_byte()]);
    match obj {
        Object::Chunk(data) => {
            sink(&(data.len() as u64).to_be_bytes());
            sink(data);
        }
        Object::List(links) | Object::Tree(links) => {
            sink(&(links.len() as u64).to_be_bytes());
            for link in links {
                sink(&(link.name.len() as u64).to_be_bytes());
                sink(link.name.as_bytes());
                sink(link.digest.as_bytes());
                sink(&link.size.to_be_bytes());
            }
        }
    }
}

/// Encoded length of `obj` in bytes.
pub fn encoded_len(obj: &Object) -> usize {
    let body = match obj {
        Object::Chunk(data) => 8 + data.len(),
        Object::List(links) | Object::Tree(links) => {
            8 + links
                .iter()
                .map(|l| 8 + l.name.len() + DIGEST_LEN + 8)
                .sum::<usize>()
        }
    };
    2 + body
}

pub(crate) fn encode(obj: &Object) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(obj));
    write(obj, &mut |bytes: &[u8]| out.put_slice(bytes));
    out
}

/// Kind of an encoded object, read from its two-byte header only.
pub fn peek_kind(bytes: &[u8]) -> ObjectResult<ObjectKind> {
    let mut buf = bytes;
    take_header(&mut buf)
}

fn take_header(buf: &mut &[u8]) -> ObjectResult<ObjectKind> {
    let version = take_u8(buf, "version")?;
    if version != FORMAT_VERSION {
        return Err(ObjectError::UnsupportedVersion(version));
    }
    let tag = take_u8(buf, "kind")?;
    ObjectKind::from_tag_byte(tag).ok_or(ObjectError::UnknownKind(tag))
}

pub(crate) fn decode(bytes: &[u8]) -> ObjectResult<Object> {
    let mut buf = bytes;
    let kind = take_header(&mut buf)?;

    let obj = match kind {
        ObjectKind::Chunk => {
            let len = take_len(&mut buf, "chunk length")?;
            Object::Chunk(take_bytes(&mut buf, len, "chunk data")?.to_vec())
        }
        ObjectKind::List => Object::List(take_links(&mut buf)?),
        ObjectKind::Tree => {
            let links = take_links(&mut buf)?;
            check_tree_order(&links)?;
            Object::Tree(links)
        }
    };

    if buf.has_remaining() {
        return Err(ObjectError::TrailingBytes(buf.remaining()));
    }
    Ok(obj)
}

fn check_tree_order(links: &[Link]) -> ObjectResult<()> {
    for pair in links.windows(2) {
        match pair[0].name.cmp(&pair[1].name) {
            std::cmp::Ordering::Less => {}
            std::cmp::Ordering::Equal => {
                return Err(ObjectError::DuplicateName(pair[1].name.clone()))
            }
            std::cmp::Ordering::Greater => {
                return Err(ObjectError::Unsorted {
                    name: pair[1].name.clone(),
                })
            }
        }
    }
    Ok(())
}

fn take_links(buf: &mut &[u8]) -> ObjectResult<Vec<Link>> {
    let count = take_len(buf, "link count")?;
    // Each link needs at least 48 bytes; cap the preallocation by what the
    // input could possibly hold.
    let mut links = Vec::with_capacity(count.min(buf.remaining() / 48));
    for _ in 0..count {
        let name_len = take_len(buf, "name length")?;
        let name = std::str::from_utf8(take_bytes(buf, name_len, "name")?)
            .map_err(|_| ObjectError::InvalidName)?
            .to_string();
        let digest_bytes = take_bytes(buf, DIGEST_LEN, "digest")?;
        let digest = Digest::from_slice(digest_bytes).map_err(|_| ObjectError::Truncated {
            field: "digest",
            needed: DIGEST_LEN,
        })?;
        let size = take_u64(buf, "size")?;
        links.push(Link { name, digest, size });
    }
    Ok(links)
}

fn need(buf: &&[u8], n: usize, field: &'static str) -> ObjectResult<()> {
    if buf.remaining() < n {
        return Err(ObjectError::Truncated {
            field,
            needed: n - buf.remaining(),
        });
    }
    Ok(())
}

fn take_u8(buf: &mut &[u8], field: &'static str) -> ObjectResult<u8> {
    need(buf, 1, field)?;
    Ok(buf.get_u8())
}

fn take_u64(buf: &mut &[u8], field: &'static str) -> ObjectResult<u64> {
    need(buf, 8, field)?;
    Ok(buf.get_u64())
}

fn take_len(buf: &mut &[u8], field: &'static str) -> ObjectResult<usize> {
    let len = take_u64(buf, field)?;
    usize::try_from(len).map_err(|_| ObjectError::TooLarge { field, len })
}

fn take_bytes<'a>(buf: &mut &'a [u8], n: usize, field: &'static str) -> ObjectResult<&'a [u8]> {
    need(buf, n, field)?;
    let (head, tail) = buf.split_at(n);
    *buf = tail;
    Ok(head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(n: u8) -> Digest {
        Digest::from_hash([n; 32])
    }

    #[test]
    fn chunk_layout() {
        let bytes = Object::chunk(b"hi".to_vec()).encode();
        assert_eq!(bytes, [1, 1, 0, 0, 0, 0, 0, 0, 0, 2, b'h', b'i']);
    }

    #[test]
    fn empty_list_layout() {
        let bytes = Object::list(Vec::new()).encode();
        assert_eq!(bytes, [1, 2, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn tree_layout() {
        let tree = Object::tree(vec![Link::new("a", d(0xaa), 5)]).unwrap();
        let bytes = tree.encode();
        assert_eq!(&bytes[..2], &[1, 3]);
        assert_eq!(&bytes[2..10], &1u64.to_be_bytes());
        assert_eq!(&bytes[10..18], &1u64.to_be_bytes());
        assert_eq!(bytes[18], b'a');
        assert_eq!(&bytes[19..51], &[0xaa; 32]);
        assert_eq!(&bytes[51..59], &5u64.to_be_bytes());
        assert_eq!(bytes.len(), 59);
        assert_eq!(encoded_len(&tree), 59);
    }

    #[test]
    fn decode_restores_list_order() {
        let list = Object::list(vec![
            Link::new("part0", d(1), 10),
            Link::new("part1", d(2), 10),
            Link::new("part2", d(3), 1),
        ]);
        assert_eq!(Object::decode(&list.encode()).unwrap(), list);
    }

    #[test]
    fn decode_rejects_unknown_version() {
        let mut bytes = Object::chunk(b"x".to_vec()).encode();
        bytes[0] = 9;
        assert_eq!(Object::decode(&bytes), Err(ObjectError::UnsupportedVersion(9)));
    }

    #[test]
    fn decode_rejects_unknown_kind() {
        let mut bytes = Object::chunk(b"x".to_vec()).encode();
        bytes[1] = 7;
        assert_eq!(Object::decode(&bytes), Err(ObjectError::UnknownKind(7)));
    }

    #[test]
    fn decode_rejects_truncation() {
        let bytes = Object::chunk(b"hello".to_vec()).encode();
        let err = Object::decode(&bytes[..bytes.len() - 2]).unwrap_err();
        assert_eq!(
            err,
            ObjectError::Truncated {
                field: "chunk data",
                needed: 2
            }
        );
        assert!(matches!(
            Object::decode(&[]),
            Err(ObjectError::Truncated { field: "version", .. })
        ));
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        let mut bytes = Object::empty_tree().encode();
        bytes.extend_from_slice(b"xx");
        assert_eq!(Object::decode(&bytes), Err(ObjectError::TrailingBytes(2)));
    }

    #[test]
    fn decode_rejects_unsorted_tree() {
        // Build the bytes by hand: Object::tree would sort them.
        let unsorted = Object::Tree(vec![Link::new("b", d(1), 1), Link::new("a", d(2), 1)]);
        let err = Object::decode(&unsorted.encode()).unwrap_err();
        assert_eq!(err, ObjectError::Unsorted { name: "a".into() });
    }

    #[test]
    fn decode_rejects_duplicate_tree_names() {
        let dup = Object::Tree(vec![Link::new("a", d(1), 1), Link::new("a", d(2), 1)]);
        let err = Object::decode(&dup.encode()).unwrap_err();
        assert_eq!(err, ObjectError::DuplicateName("a".into()));
    }

    #[test]
    fn decode_rejects_invalid_utf8_name() {
        let mut bytes = Object::Tree(vec![Link::new("a", d(1), 1)]).encode();
        bytes[18] = 0xff;
        assert_eq!(Object::decode(&bytes), Err(ObjectError::InvalidName));
    }

    #[test]
    fn peek_kind_reads_only_the_header() {
        let list = Object::list(vec![Link::new("part0", d(1), 3)]).encode();
        assert_eq!(peek_kind(&list), Ok(ObjectKind::List));
        assert_eq!(peek_kind(&list[..2]), Ok(ObjectKind::List));
        assert_eq!(peek_kind(&Object::empty_tree().encode()), Ok(ObjectKind::Tree));
        assert_eq!(peek_kind(&[FORMAT_VERSION, 7]), Err(ObjectError::UnknownKind(7)));
        assert_eq!(peek_kind(&[2, 1]), Err(ObjectError::UnsupportedVersion(2)));
        assert!(matches!(peek_kind(&[FORMAT_VERSION]), Err(ObjectError::Truncated { .. })));
    }

    #[test]
    fn too_large_reports_the_declared_length() {
        let err = ObjectError::TooLarge {
            field: "chunk length",
            len: u64::MAX,
        };
        assert_eq!(err.to_string(), format!("chunk length too large for encoding: {}", u64::MAX));
    }

    #[cfg(target_pointer_width = "32")]
    #[test]
    fn length_beyond_address_space_is_too_large() {
        let declared = u64::from(u32::MAX) + 1;
        let mut bytes = vec![FORMAT_VERSION, ObjectKind::Chunk.tag_byte()];
        bytes.extend_from_slice(&declared.to_be_bytes());
        assert_eq!(
            Object::decode(&bytes),
            Err(ObjectError::TooLarge {
                field: "chunk length",
                len: declared
            })
        );
    }

    #[test]
    fn huge_declared_count_does_not_allocate() {
        let mut bytes = vec![FORMAT_VERSION, ObjectKind::List.tag_byte()];
        bytes.extend_from_slice(&u64::MAX.to_be_bytes());
        assert!(matches!(
            Object::decode(&bytes),
            Err(ObjectError::Truncated { .. }) | Err(ObjectError::TooLarge { .. })
        ));
    }

    proptest! {
        #[test]
        fn reencoding_a_decoded_object_is_identity(
            data in proptest::collection::vec(any::<u8>(), 0..512),
            names in proptest::collection::btree_set("[a-z0-9._-]{1,12}", 0..8),
        ) {
            let chunk = Object::chunk(data).encode();
            prop_assert_eq!(Object::decode(&chunk).unwrap().encode(), chunk);

            let links = names.into_iter().enumerate()
                .map(|(i, n)| Link::new(n, d(i as u8), i as u64))
                .collect();
            let tree = Object::tree(links).unwrap().encode();
            prop_assert_eq!(Object::decode(&tree).unwrap().encode(), tree);
        }
    }
}
