//! Offset-tracking decode cursor.
//!
//! Teacher's NBT decoder reads off a bare `bytes::Buf`, which has no position query, so
//! a malformed-input error can only say "ran out of bytes" with no offset. The
//! `MalformedTag{offset, ..}` contract needs a real position, so decoding walks a slice
//! directly instead.

use crate::endian::Endianness;
use crate::error::NbtError;

pub(crate) struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    pub fn offset(&self) -> usize {
        self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], NbtError> {
        if self.data.len().saturating_sub(self.pos) < n {
            return Err(NbtError::at(self.pos, "unexpected end of data"));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, NbtError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, NbtError> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn read_u16(&mut self, e: Endianness) -> Result<u16, NbtError> {
        let b = self.take(2)?;
        let arr = [b[0], b[1]];
        Ok(match e {
            Endianness::Big => u16::from_be_bytes(arr),
            Endianness::Little => u16::from_le_bytes(arr),
        })
    }

    pub fn read_i16(&mut self, e: Endianness) -> Result<i16, NbtError> {
        Ok(self.read_u16(e)? as i16)
    }

    pub fn read_u32(&mut self, e: Endianness) -> Result<u32, NbtError> {
        let b = self.take(4)?;
        let arr = [b[0], b[1], b[2], b[3]];
        Ok(match e {
            Endianness::Big => u32::from_be_bytes(arr),
            Endianness::Little => u32::from_le_bytes(arr),
        })
    }

    pub fn read_i32(&mut self, e: Endianness) -> Result<i32, NbtError> {
        Ok(self.read_u32(e)? as i32)
    }

    pub fn read_u64(&mut self, e: Endianness) -> Result<u64, NbtError> {
        let b = self.take(8)?;
        let arr: [u8; 8] = b.try_into().expect("take(8) yields 8 bytes");
        Ok(match e {
            Endianness::Big => u64::from_be_bytes(arr),
            Endianness::Little => u64::from_le_bytes(arr),
        })
    }

    pub fn read_i64(&mut self, e: Endianness) -> Result<i64, NbtError> {
        Ok(self.read_u64(e)? as i64)
    }

    pub fn read_f32(&mut self, e: Endianness) -> Result<f32, NbtError> {
        Ok(f32::from_bits(self.read_u32(e)?))
    }

    pub fn read_f64(&mut self, e: Endianness) -> Result<f64, NbtError> {
        Ok(f64::from_bits(self.read_u64(e)?))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], NbtError> {
        self.take(n)
    }
}
