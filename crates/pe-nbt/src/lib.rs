//! Hierarchical tagged-value codec for pocket-edition world storage.
//!
//! Values are big- or little-endian depending on an explicit [`Endianness`] argument,
//! or the thread-local session endianness set by [`with_little_endian`]. Entity and
//! tile-entity payloads use the separate [`compound_list`] framing on top of this.

pub mod compound_list;
mod cursor;
pub mod endian;
pub mod error;
mod io;
pub mod tag;

pub use compound_list::{decode_compound_list, encode_compound_list};
pub use endian::{current, with_little_endian, Endianness};
pub use error::NbtError;
pub use tag::{NbtCompound, NbtRoot, NbtTag};

use bytes::BytesMut;

/// Decode a tagged root compound with an explicit byte order.
pub fn decode(data: &[u8], endian: Endianness) -> Result<NbtRoot, NbtError> {
    io::read_nbt(data, endian)
}

/// Encode a tagged root compound with an explicit byte order.
pub fn encode(root: &NbtRoot, endian: Endianness) -> Vec<u8> {
    let mut buf = BytesMut::new();
    io::write_nbt(&mut buf, root, endian);
    buf.to_vec()
}

/// Decode using whatever endianness is ambient on this thread (see [`current`]).
pub fn decode_ambient(data: &[u8]) -> Result<NbtRoot, NbtError> {
    decode(data, current())
}

/// Encode using whatever endianness is ambient on this thread (see [`current`]).
pub fn encode_ambient(root: &NbtRoot) -> Vec<u8> {
    encode(root, current())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(root: &NbtRoot, endian: Endianness) {
        let bytes = encode(root, endian);
        let decoded = decode(&bytes, endian).unwrap();
        assert_eq!(decoded, *root);
    }

    #[test]
    fn le_empty_compound() {
        roundtrip(&NbtRoot::new("", NbtCompound::new()), Endianness::Little);
    }

    #[test]
    fn be_empty_compound() {
        roundtrip(&NbtRoot::new("", NbtCompound::new()), Endianness::Big);
    }

    #[test]
    fn le_root_name() {
        roundtrip(&NbtRoot::new("hello world", NbtCompound::new()), Endianness::Little);
    }

    #[test]
    fn le_byte() {
        let mut c = NbtCompound::new();
        c.insert("val".into(), NbtTag::Byte(42));
        roundtrip(&NbtRoot::new("", c), Endianness::Little);
    }

    #[test]
    fn le_short() {
        let mut c = NbtCompound::new();
        c.insert("val".into(), NbtTag::Short(-1234));
        roundtrip(&NbtRoot::new("", c), Endianness::Little);
    }

    #[test]
    fn le_int() {
        let mut c = NbtCompound::new();
        c.insert("val".into(), NbtTag::Int(100_000));
        roundtrip(&NbtRoot::new("", c), Endianness::Little);
    }

    #[test]
    fn le_long() {
        let mut c = NbtCompound::new();
        c.insert("val".into(), NbtTag::Long(i64::MAX));
        roundtrip(&NbtRoot::new("", c), Endianness::Little);
    }

    #[test]
    fn le_float() {
        let mut c = NbtCompound::new();
        c.insert("val".into(), NbtTag::Float(3.125));
        roundtrip(&NbtRoot::new("", c), Endianness::Little);
    }

    #[test]
    fn le_double() {
        let mut c = NbtCompound::new();
        c.insert("val".into(), NbtTag::Double(std::f64::consts::PI));
        roundtrip(&NbtRoot::new("", c), Endianness::Little);
    }

    #[test]
    fn le_string_unicode() {
        let mut c = NbtCompound::new();
        c.insert("val".into(), NbtTag::String("日本語".into()));
        roundtrip(&NbtRoot::new("", c), Endianness::Little);
    }

    #[test]
    fn le_byte_array() {
        let mut c = NbtCompound::new();
        c.insert("val".into(), NbtTag::ByteArray(vec![1, 2, 3, 4, 5]));
        roundtrip(&NbtRoot::new("", c), Endianness::Little);
    }

    #[test]
    fn le_int_array() {
        let mut c = NbtCompound::new();
        c.insert("val".into(), NbtTag::IntArray(vec![100, 200, 300]));
        roundtrip(&NbtRoot::new("", c), Endianness::Little);
    }

    #[test]
    fn le_short_array() {
        let mut c = NbtCompound::new();
        c.insert("val".into(), NbtTag::ShortArray(vec![1, 2, 3]));
        roundtrip(&NbtRoot::new("", c), Endianness::Little);
    }

    #[test]
    fn le_empty_list() {
        let mut c = NbtCompound::new();
        c.insert("list".into(), NbtTag::List(vec![]));
        roundtrip(&NbtRoot::new("", c), Endianness::Little);
    }

    #[test]
    fn le_list_of_ints() {
        let mut c = NbtCompound::new();
        c.insert(
            "list".into(),
            NbtTag::List(vec![NbtTag::Int(1), NbtTag::Int(2), NbtTag::Int(3)]),
        );
        roundtrip(&NbtRoot::new("", c), Endianness::Little);
    }

    #[test]
    fn le_nested_compound_preserves_field_order() {
        let mut inner = NbtCompound::new();
        inner.insert("z".into(), NbtTag::Int(10));
        inner.insert("a".into(), NbtTag::Int(64));
        inner.insert("m".into(), NbtTag::Int(-10));

        let mut c = NbtCompound::new();
        c.insert("pos".into(), NbtTag::Compound(inner));
        roundtrip(&NbtRoot::new("", c.clone()), Endianness::Little);

        let bytes = encode(&NbtRoot::new("", c.clone()), Endianness::Little);
        let decoded = decode(&bytes, Endianness::Little).unwrap();
        let keys: Vec<&str> = decoded.compound["pos"]
            .as_compound()
            .unwrap()
            .keys()
            .map(|s| s.as_str())
            .collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn le_complex_structure() {
        let mut inner = NbtCompound::new();
        inner.insert("name".into(), NbtTag::String("Steve".into()));
        inner.insert("health".into(), NbtTag::Float(20.0));
        inner.insert("xp".into(), NbtTag::Int(1500));

        let mut c = NbtCompound::new();
        c.insert("player".into(), NbtTag::Compound(inner));
        c.insert("version".into(), NbtTag::Int(19133));
        c.insert(
            "inventory".into(),
            NbtTag::List(vec![
                NbtTag::Compound({
                    let mut item = NbtCompound::new();
                    item.insert("id".into(), NbtTag::Short(1));
                    item.insert("count".into(), NbtTag::Byte(64));
                    item
                }),
                NbtTag::Compound({
                    let mut item = NbtCompound::new();
                    item.insert("id".into(), NbtTag::Short(4));
                    item.insert("count".into(), NbtTag::Byte(32));
                    item
                }),
            ]),
        );
        roundtrip(&NbtRoot::new("level", c), Endianness::Little);
    }

    #[test]
    fn ambient_scope_matches_explicit_little_endian() {
        let mut c = NbtCompound::new();
        c.insert("val".into(), NbtTag::Int(7));
        let root = NbtRoot::new("", c);
        let explicit = encode(&root, Endianness::Little);
        let ambient = with_little_endian(|| encode_ambient(&root));
        assert_eq!(explicit, ambient);
    }

    #[test]
    fn le_and_be_bytes_differ() {
        let mut c = NbtCompound::new();
        c.insert("val".into(), NbtTag::Int(1));
        let root = NbtRoot::new("", c);
        assert_ne!(
            encode(&root, Endianness::Little),
            encode(&root, Endianness::Big)
        );
    }

    #[test]
    fn empty_buffer_error() {
        assert!(decode(&[], Endianness::Little).is_err());
    }

    #[test]
    fn wrong_root_type_error() {
        let err = decode(&[1], Endianness::Little).unwrap_err();
        match err {
            NbtError::MalformedTag { offset, reason } => {
                assert_eq!(offset, 0);
                assert!(reason.contains("TAG_Compound"));
            }
        }
    }

    #[test]
    fn truncated_input_reports_offset() {
        // TAG_Compound, name len 0, one field header (TAG_Int) then nothing.
        let data = [10u8, 0, 0, 3, 0, 0];
        let err = decode(&data, Endianness::Little).unwrap_err();
        match err {
            NbtError::MalformedTag { offset, .. } => assert_eq!(offset, data.len()),
        }
    }
}
