//! Tagged-value encode/decode, parameterized by byte order.
//!
//! Teacher's NBT dispatches LE-vs-network through a generic `NbtVariant` trait, because
//! the network variant needs a wholly different integer encoding (VarInt). Here the two
//! variants differ only in byte order, so a runtime [`Endianness`] argument does the job
//! without the extra monomorphized trait machinery.

use bytes::BufMut;

use crate::cursor::Cursor;
use crate::endian::Endianness;
use crate::error::NbtError;
use crate::tag::{NbtCompound, NbtRoot, NbtTag};

const MAX_DEPTH: usize = 512;

// ---------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------

pub(crate) fn read_nbt(data: &[u8], endian: Endianness) -> Result<NbtRoot, NbtError> {
    let mut cursor = Cursor::new(data);
    let tag_type = cursor.read_u8()?;
    if tag_type != 10 {
        return Err(NbtError::at(
            cursor.offset() - 1,
            format!("expected TAG_Compound (10) at root, got {tag_type}"),
        ));
    }
    let name = read_string(&mut cursor, endian)?;
    let compound = read_compound(&mut cursor, endian, 0)?;
    Ok(NbtRoot { name, compound })
}

fn read_tag(
    cursor: &mut Cursor<'_>,
    endian: Endianness,
    tag_type: u8,
    depth: usize,
) -> Result<NbtTag, NbtError> {
    if depth > MAX_DEPTH {
        return Err(NbtError::at(
            cursor.offset(),
            format!("nesting too deep (limit: {MAX_DEPTH})"),
        ));
    }

    match tag_type {
        1 => Ok(NbtTag::Byte(cursor.read_i8()?)),
        2 => Ok(NbtTag::Short(cursor.read_i16(endian)?)),
        3 => Ok(NbtTag::Int(cursor.read_i32(endian)?)),
        4 => Ok(NbtTag::Long(cursor.read_i64(endian)?)),
        5 => Ok(NbtTag::Float(cursor.read_f32(endian)?)),
        6 => Ok(NbtTag::Double(cursor.read_f64(endian)?)),
        7 => {
            let len = read_len(cursor, endian)?;
            Ok(NbtTag::ByteArray(cursor.read_bytes(len)?.to_vec()))
        }
        8 => Ok(NbtTag::String(read_string(cursor, endian)?)),
        9 => {
            let element_type = cursor.read_u8()?;
            let len = read_len(cursor, endian)?;
            let mut list = Vec::with_capacity(len);
            for _ in 0..len {
                list.push(read_tag(cursor, endian, element_type, depth + 1)?);
            }
            Ok(NbtTag::List(list))
        }
        10 => Ok(NbtTag::Compound(read_compound(cursor, endian, depth + 1)?)),
        11 => {
            let len = read_len(cursor, endian)?;
            let mut arr = Vec::with_capacity(len);
            for _ in 0..len {
                arr.push(cursor.read_u32(endian)?);
            }
            Ok(NbtTag::IntArray(arr))
        }
        12 => {
            let len = read_len(cursor, endian)?;
            let mut arr = Vec::with_capacity(len);
            for _ in 0..len {
                arr.push(cursor.read_u16(endian)?);
            }
            Ok(NbtTag::ShortArray(arr))
        }
        other => Err(NbtError::at(
            cursor.offset(),
            format!("unknown tag type: {other}"),
        )),
    }
}

pub(crate) fn read_compound(
    cursor: &mut Cursor<'_>,
    endian: Endianness,
    depth: usize,
) -> Result<NbtCompound, NbtError> {
    if depth > MAX_DEPTH {
        return Err(NbtError::at(
            cursor.offset(),
            format!("nesting too deep (limit: {MAX_DEPTH})"),
        ));
    }
    let mut map = NbtCompound::new();
    loop {
        let tag_type = cursor.read_u8()?;
        if tag_type == 0 {
            break;
        }
        let name = read_string(cursor, endian)?;
        let tag = read_tag(cursor, endian, tag_type, depth)?;
        map.insert(name, tag);
    }
    Ok(map)
}

pub(crate) fn read_string(cursor: &mut Cursor<'_>, endian: Endianness) -> Result<String, NbtError> {
    let len = cursor.read_u16(endian)? as usize;
    let bytes = cursor.read_bytes(len)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|_| NbtError::at(cursor.offset() - len, "invalid UTF-8 in string"))
}

/// Array/list length prefixes are signed 32-bit on the wire; negative is malformed.
fn read_len(cursor: &mut Cursor<'_>, endian: Endianness) -> Result<usize, NbtError> {
    let len = cursor.read_i32(endian)?;
    if len < 0 {
        return Err(NbtError::at(
            cursor.offset() - 4,
            format!("negative array length: {len}"),
        ));
    }
    Ok(len as usize)
}

// ---------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------

pub(crate) fn write_nbt(buf: &mut impl BufMut, root: &NbtRoot, endian: Endianness) {
    buf.put_u8(10);
    write_string(buf, &root.name, endian);
    write_compound(buf, &root.compound, endian);
}

fn write_tag(buf: &mut impl BufMut, tag: &NbtTag, endian: Endianness) {
    match tag {
        NbtTag::Byte(v) => buf.put_i8(*v),
        NbtTag::Short(v) => write_u16(buf, *v as u16, endian),
        NbtTag::Int(v) => write_u32(buf, *v as u32, endian),
        NbtTag::Long(v) => write_u64(buf, *v as u64, endian),
        NbtTag::Float(v) => write_u32(buf, v.to_bits(), endian),
        NbtTag::Double(v) => write_u64(buf, v.to_bits(), endian),
        NbtTag::ByteArray(arr) => {
            write_len(buf, arr.len(), endian);
            buf.put_slice(arr);
        }
        NbtTag::String(s) => write_string(buf, s, endian),
        NbtTag::List(list) => {
            if list.is_empty() {
                buf.put_u8(0);
                write_len(buf, 0, endian);
            } else {
                buf.put_u8(list[0].tag_type_id());
                write_len(buf, list.len(), endian);
                for item in list {
                    write_tag(buf, item, endian);
                }
            }
        }
        NbtTag::Compound(map) => write_compound(buf, map, endian),
        NbtTag::IntArray(arr) => {
            write_len(buf, arr.len(), endian);
            for &v in arr {
                write_u32(buf, v, endian);
            }
        }
        NbtTag::ShortArray(arr) => {
            write_len(buf, arr.len(), endian);
            for &v in arr {
                write_u16(buf, v, endian);
            }
        }
    }
}

pub(crate) fn write_compound(buf: &mut impl BufMut, map: &NbtCompound, endian: Endianness) {
    for (name, tag) in map {
        buf.put_u8(tag.tag_type_id());
        write_string(buf, name, endian);
        write_tag(buf, tag, endian);
    }
    buf.put_u8(0);
}

pub(crate) fn write_string(buf: &mut impl BufMut, s: &str, endian: Endianness) {
    write_u16(buf, s.len() as u16, endian);
    buf.put_slice(s.as_bytes());
}

fn write_len(buf: &mut impl BufMut, len: usize, endian: Endianness) {
    write_u32(buf, len as u32, endian);
}

fn write_u16(buf: &mut impl BufMut, v: u16, endian: Endianness) {
    match endian {
        Endianness::Big => buf.put_u16(v),
        Endianness::Little => buf.put_u16_le(v),
    }
}

fn write_u32(buf: &mut impl BufMut, v: u32, endian: Endianness) {
    match endian {
        Endianness::Big => buf.put_u32(v),
        Endianness::Little => buf.put_u32_le(v),
    }
}

fn write_u64(buf: &mut impl BufMut, v: u64, endian: Endianness) {
    match endian {
        Endianness::Big => buf.put_u64(v),
        Endianness::Little => buf.put_u64_le(v),
    }
}
