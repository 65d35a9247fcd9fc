//! Compound-list framing: concatenate top-level Compound tags using a four-zero-byte
//! separator, the way entity and tile-entity payloads are stored.
//!
//! This is a store-specific framing convention, not a general NBT feature — it only
//! has to round-trip compounds produced by this same encoder, and (like the source it
//! was distilled from) is not proofed against a compound body that happens to contain
//! the literal 5-byte separator sequence.

use crate::cursor::Cursor;
use crate::endian::Endianness;
use crate::error::NbtError;
use crate::io;
use crate::tag::NbtCompound;

const SEPARATOR: [u8; 5] = [0, 0, 0, 0, 0x0A];

/// Encode a sequence of compounds. An empty slice encodes to zero bytes.
pub fn encode_compound_list(compounds: &[NbtCompound], endian: Endianness) -> Vec<u8> {
    let mut out = Vec::new();
    for (idx, compound) in compounds.iter().enumerate() {
        if idx > 0 {
            // The previous entry's End byte supplies the separator's first zero; these
            // three plus the upcoming 0x0A type byte complete it.
            out.extend_from_slice(&[0, 0, 0]);
        }
        out.push(0x0A);
        io::write_string(&mut out, "", endian);
        io::write_compound(&mut out, compound, endian);
    }
    out
}

/// Decode a sequence of compounds previously produced by [`encode_compound_list`].
pub fn decode_compound_list(data: &[u8], endian: Endianness) -> Result<Vec<NbtCompound>, NbtError> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let mut pieces: Vec<&[u8]> = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i + SEPARATOR.len() <= data.len() {
        if data[i..i + SEPARATOR.len()] == SEPARATOR {
            pieces.push(&data[start..i]);
            start = i + SEPARATOR.len();
            i = start;
        } else {
            i += 1;
        }
    }
    pieces.push(&data[start..]);

    let mut result = Vec::with_capacity(pieces.len());
    for (idx, piece) in pieces.into_iter().enumerate() {
        let mut buf = Vec::with_capacity(piece.len() + 5);
        if idx > 0 {
            // The separator match consumed this entry's leading type byte.
            buf.push(0x0A);
        }
        buf.extend_from_slice(piece);
        // Safe padding: the separator match may also have consumed this entry's own
        // End byte (whenever another entry follows). Extra trailing zeros are inert —
        // decoding a compound stops at its first End byte regardless of what follows.
        buf.extend_from_slice(&[0, 0, 0, 0]);

        let mut cursor = Cursor::new(&buf);
        let tag_type = cursor.read_u8()?;
        if tag_type != 10 {
            return Err(NbtError::at(
                0,
                format!("expected compound entry in list, got tag type {tag_type}"),
            ));
        }
        let _name = io::read_string(&mut cursor, endian)?;
        let compound = io::read_compound(&mut cursor, endian, 0)?;
        result.push(compound);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::NbtTag;

    fn compound_with(fields: &[(&str, NbtTag)]) -> NbtCompound {
        let mut c = NbtCompound::new();
        for (k, v) in fields {
            c.insert((*k).to_string(), v.clone());
        }
        c
    }

    #[test]
    fn empty_list_encodes_to_zero_bytes() {
        let encoded = encode_compound_list(&[], Endianness::Little);
        assert!(encoded.is_empty());
        let decoded = decode_compound_list(&encoded, Endianness::Little).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn single_compound_roundtrip() {
        let c = compound_with(&[("id", NbtTag::Int(42))]);
        let encoded = encode_compound_list(&[c.clone()], Endianness::Little);
        let decoded = decode_compound_list(&encoded, Endianness::Little).unwrap();
        assert_eq!(decoded, vec![c]);
    }

    #[test]
    fn multiple_compounds_roundtrip() {
        let a = compound_with(&[("id", NbtTag::Int(1)), ("name", NbtTag::String("Zombie".into()))]);
        let b = compound_with(&[("id", NbtTag::Int(2))]);
        let c = compound_with(&[("id", NbtTag::Int(3)), ("health", NbtTag::Float(10.0))]);
        let list = vec![a, b, c];
        let encoded = encode_compound_list(&list, Endianness::Little);
        let decoded = decode_compound_list(&encoded, Endianness::Little).unwrap();
        assert_eq!(decoded, list);
    }

    #[test]
    fn separator_appears_between_entries() {
        let a = compound_with(&[("x", NbtTag::Byte(1))]);
        let b = compound_with(&[("y", NbtTag::Byte(2))]);
        let encoded = encode_compound_list(&[a, b], Endianness::Little);
        assert!(encoded.windows(SEPARATOR.len()).any(|w| w == SEPARATOR));
    }
}
