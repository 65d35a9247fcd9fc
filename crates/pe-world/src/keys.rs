//! Store key encoding: `[cx:i32_le][cz:i32_le][tag]`.

pub const TAG_TERRAIN: u8 = b'0';
pub const TAG_TILE_ENTITIES: u8 = b'1';
pub const TAG_ENTITIES: u8 = b'2';

pub fn chunk_key(cx: i32, cz: i32, tag: u8) -> [u8; 9] {
    let mut key = [0u8; 9];
    key[0..4].copy_from_slice(&cx.to_le_bytes());
    key[4..8].copy_from_slice(&cz.to_le_bytes());
    key[8] = tag;
    key
}

/// Parse a 9-byte chunk key into (cx, cz, tag). `None` if `key` isn't exactly 9 bytes.
pub fn parse_chunk_key(key: &[u8]) -> Option<(i32, i32, u8)> {
    if key.len() != 9 {
        return None;
    }
    let cx = i32::from_le_bytes(key[0..4].try_into().unwrap());
    let cz = i32::from_le_bytes(key[4..8].try_into().unwrap());
    Some((cx, cz, key[8]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let key = chunk_key(-3, 17, TAG_TERRAIN);
        assert_eq!(parse_chunk_key(&key), Some((-3, 17, TAG_TERRAIN)));
    }

    #[test]
    fn wrong_length_is_none() {
        assert_eq!(parse_chunk_key(&[0u8; 8]), None);
        assert_eq!(parse_chunk_key(&[0u8; 10]), None);
    }

    #[test]
    fn other_tags_still_parse() {
        let key = chunk_key(0, 0, 0x2C);
        assert_eq!(parse_chunk_key(&key), Some((0, 0, 0x2C)));
    }
}
