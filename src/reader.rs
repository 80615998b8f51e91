use byteorder::{BigEndian, ByteOrder, LittleEndian};
use glam::{Quat, Vec3};

use crate::error::DecodeError;

/// Bounds-checked cursor over an in-memory asset buffer.
///
/// All multi-byte fields in the Vulpes containers are little-endian; the one
/// exception, the Radiance scanline length, has its own big-endian read.
/// Every read fails with [`DecodeError::UnexpectedEof`] instead of touching
/// bytes past the end of the buffer.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Cursor offset from the start of the buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    fn eof(&self) -> DecodeError {
        DecodeError::UnexpectedEof { offset: self.pos }
    }

    /// Take the next `len` bytes, advancing the cursor.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(len).ok_or_else(|| self.eof())?;
        if end > self.data.len() {
            return Err(self.eof());
        }
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Look at the next byte without advancing.
    pub fn peek_u8(&self) -> Result<u8, DecodeError> {
        self.data.get(self.pos).copied().ok_or_else(|| self.eof())
    }

    /// Consume `tag` if it is next in the buffer.
    pub fn eat(&mut self, tag: &[u8]) -> bool {
        if self.data[self.pos..].starts_with(tag) {
            self.pos += tag.len();
            true
        } else {
            false
        }
    }

    /// Check and consume a fixed magic signature.
    pub fn expect_magic(&mut self, magic: &[u8], what: &str) -> Result<(), DecodeError> {
        if !self.eat(magic) {
            return Err(DecodeError::Format(format!("invalid {what} signature")));
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16, DecodeError> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_u16_be(&mut self) -> Result<u16, DecodeError> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, DecodeError> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_f32_le(&mut self) -> Result<f32, DecodeError> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    pub fn read_vec3(&mut self) -> Result<Vec3, DecodeError> {
        Ok(Vec3::new(
            self.read_f32_le()?,
            self.read_f32_le()?,
            self.read_f32_le()?,
        ))
    }

    /// Quaternion stored in `(w, x, y, z)` component order.
    pub fn read_quat_wxyz(&mut self) -> Result<Quat, DecodeError> {
        let w = self.read_f32_le()?;
        let x = self.read_f32_le()?;
        let y = self.read_f32_le()?;
        let z = self.read_f32_le()?;
        Ok(Quat::from_xyzw(x, y, z, w))
    }

    /// Read `count` little-endian floats into a flat vector.
    pub fn read_f32_array(&mut self, count: usize) -> Result<Vec<f32>, DecodeError> {
        let len = count.checked_mul(4).ok_or_else(|| self.eof())?;
        let bytes = self.take(len)?;
        let mut out = vec![0.0f32; count];
        LittleEndian::read_f32_into(bytes, &mut out);
        Ok(out)
    }

    /// Read `count` little-endian u32 values into a flat vector.
    pub fn read_u32_array(&mut self, count: usize) -> Result<Vec<u32>, DecodeError> {
        let len = count.checked_mul(4).ok_or_else(|| self.eof())?;
        let bytes = self.take(len)?;
        let mut out = vec![0u32; count];
        LittleEndian::read_u32_into(bytes, &mut out);
        Ok(out)
    }

    /// A u8 length prefix followed by that many name bytes.
    pub fn read_short_string(&mut self) -> Result<String, DecodeError> {
        let len = self.read_u8()? as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_reads_advance_the_cursor() {
        let data = [0x01, 0x02, 0x00, 0x03, 0x00, 0x00, 0x00];
        let mut r = ByteReader::new(&data);

        assert_eq!(r.read_u8().unwrap(), 1);
        assert_eq!(r.read_u16_le().unwrap(), 2);
        assert_eq!(r.read_u32_le().unwrap(), 3);
        assert_eq!(r.position(), 7);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn big_endian_u16() {
        let mut r = ByteReader::new(&[0x01, 0x40]);
        assert_eq!(r.read_u16_be().unwrap(), 0x0140);
    }

    #[test]
    fn reads_past_the_end_fail() {
        let mut r = ByteReader::new(&[0xff, 0xff]);
        assert!(matches!(
            r.read_u32_le(),
            Err(DecodeError::UnexpectedEof { offset: 0 })
        ));
        // A failed read does not advance the cursor.
        assert_eq!(r.read_u16_le().unwrap(), 0xffff);
    }

    #[test]
    fn short_string_is_length_prefixed() {
        let mut r = ByteReader::new(b"\x04Root\xff");
        assert_eq!(r.read_short_string().unwrap(), "Root");
        assert_eq!(r.remaining(), 1);
    }

    #[test]
    fn truncated_short_string_fails() {
        let mut r = ByteReader::new(b"\x09Root");
        assert!(matches!(
            r.read_short_string(),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn eat_only_consumes_on_match() {
        let mut r = ByteReader::new(b"VULP\x05");
        assert!(!r.eat(b"VULS"));
        assert_eq!(r.position(), 0);
        assert!(r.eat(b"VULP"));
        assert_eq!(r.position(), 4);
    }

    #[test]
    fn quat_components_are_reordered() {
        let mut data = Vec::new();
        for v in [1.0f32, 2.0, 3.0, 4.0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let q = ByteReader::new(&data).read_quat_wxyz().unwrap();
        assert_eq!(q.w, 1.0);
        assert_eq!(q.x, 2.0);
        assert_eq!(q.y, 3.0);
        assert_eq!(q.z, 4.0);
    }
}
