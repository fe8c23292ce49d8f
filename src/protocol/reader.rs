//! Little-endian binary reader
//!
//! Setiap fixed-size read melakukan loop pada source sampai span penuh,
//! jadi aman untuk streaming source seperti [`Connection`] yang memberi
//! partial read.
//!
//! [`Connection`]: crate::network::Connection

use std::io::{self, Read};

use byteorder::{ByteOrder, LittleEndian};

use super::text::TextEncoding;
use super::varint::{self, GroupWidth};
use crate::error::{Error, Result};

// Primitive fixed-size terlebar
const SCRATCH_LEN: usize = 8;

/// Reads primitives, strings and varints from any [`Read`].
pub struct BinaryReader<R> {
    inner: R,
    encoding: TextEncoding,
    leave_open: bool,
    scratch: [u8; SCRATCH_LEN],
}

impl<R: Read> BinaryReader<R> {
    /// UTF-8 reader that owns `inner`.
    pub fn new(inner: R) -> Self {
        Self::with_options(inner, TextEncoding::Utf8, false)
    }

    pub fn with_encoding(inner: R, encoding: TextEncoding) -> Self {
        Self::with_options(inner, encoding, false)
    }

    /// With `leave_open`, [`close`](Self::close) hands `inner` back instead
    /// of dropping it.
    pub fn with_options(inner: R, encoding: TextEncoding, leave_open: bool) -> Self {
        Self {
            inner,
            encoding,
            leave_open,
            scratch: [0u8; SCRATCH_LEN],
        }
    }

    #[inline]
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Drops the source unless the reader was built with `leave_open`.
    pub fn close(self) -> Option<R> {
        if self.leave_open {
            Some(self.inner)
        } else {
            None
        }
    }

    /// Fills `dest[offset..offset + length]` completely.
    pub fn read(&mut self, dest: &mut [u8], offset: usize, length: usize) -> Result<()> {
        let dest_len = dest.len();
        let span = offset
            .checked_add(length)
            .and_then(|end| dest.get_mut(offset..end))
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "range {}..{}+{} out of bounds for destination of {} bytes",
                    offset,
                    offset,
                    length,
                    dest_len
                ))
            })?;
        fill(&mut self.inner, span)
    }

    /// Fills all of `dest`, or fails with `EndOfStream`.
    #[inline]
    pub fn read_fully(&mut self, dest: &mut [u8]) -> Result<()> {
        fill(&mut self.inner, dest)
    }

    pub fn read_bytes(&mut self, length: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; length];
        self.read_fully(&mut bytes)?;
        Ok(bytes)
    }

    #[inline]
    fn read_scratch(&mut self, width: usize) -> Result<&[u8]> {
        fill(&mut self.inner, &mut self.scratch[..width])?;
        Ok(&self.scratch[..width])
    }

    /// Unsigned little-endian integer of `width` bytes (1..=8).
    pub fn read_uint(&mut self, width: usize) -> Result<u64> {
        check_width(width)?;
        let bytes = self.read_scratch(width)?;
        Ok(bytes
            .iter()
            .enumerate()
            .fold(0u64, |acc, (index, &b)| acc | (u64::from(b) << (index * 8))))
    }

    /// Signed little-endian integer of `width` bytes, sign-extended.
    pub fn read_int(&mut self, width: usize) -> Result<i64> {
        // Layout bit sama dengan unsigned, hanya top bit yang diinterpretasi
        let raw = self.read_uint(width)?;
        let unused = 64 - (width as u32) * 8;
        Ok(((raw << unused) as i64) >> unused)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_scratch(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read_scratch(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_scratch(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.read_scratch(8)?))
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.read_scratch(2)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.read_scratch(4)?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(LittleEndian::read_i64(self.read_scratch(8)?))
    }

    /// Single-precision float. Consumes exactly 4 bytes.
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.read_scratch(4)?))
    }

    /// Double-precision float. Consumes exactly 8 bytes.
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(LittleEndian::read_f64(self.read_scratch(8)?))
    }

    /// Decodes `length` bytes with the reader's encoding.
    pub fn read_string(&mut self, length: usize) -> Result<String> {
        let bytes = self.read_bytes(length)?;
        Ok(self.encoding.decode(&bytes))
    }

    pub fn read_chars(&mut self, length: usize) -> Result<Vec<char>> {
        Ok(self.read_string(length)?.chars().collect())
    }

    pub fn read_varuint7(&mut self, max_len: usize) -> Result<u64> {
        self.read_varuint(GroupWidth::Seven, max_len)
    }

    pub fn read_varuint15(&mut self, max_len: usize) -> Result<u64> {
        self.read_varuint(GroupWidth::Fifteen, max_len)
    }

    pub fn read_varsint7(&mut self, max_len: usize) -> Result<i64> {
        self.read_varsint(GroupWidth::Seven, max_len)
    }

    pub fn read_varsint15(&mut self, max_len: usize) -> Result<i64> {
        self.read_varsint(GroupWidth::Fifteen, max_len)
    }

    fn read_varuint(&mut self, width: GroupWidth, max_len: usize) -> Result<u64> {
        varint::decode_unsigned(width, max_len, || self.read_group(width))
    }

    fn read_varsint(&mut self, width: GroupWidth, max_len: usize) -> Result<i64> {
        varint::decode_signed(width, max_len, || self.read_group(width))
    }

    fn read_group(&mut self, width: GroupWidth) -> Result<u16> {
        match width {
            GroupWidth::Seven => Ok(u16::from(self.read_u8()?)),
            GroupWidth::Fifteen => self.read_u16(),
        }
    }
}

impl<R> std::fmt::Debug for BinaryReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryReader")
            .field("encoding", &self.encoding)
            .field("leave_open", &self.leave_open)
            .finish_non_exhaustive()
    }
}

#[inline]
fn check_width(width: usize) -> Result<()> {
    if !(1..=8).contains(&width) {
        return Err(Error::invalid_argument(format!(
            "integer width must be within 1..=8, got {}",
            width
        )));
    }
    Ok(())
}

/// Loop pada `source` sampai `dest` penuh.
fn fill<R: Read>(source: &mut R, dest: &mut [u8]) -> Result<()> {
    let mut total = 0;
    while total < dest.len() {
        match source.read(&mut dest[total..]) {
            Ok(0) => {
                return Err(Error::EndOfStream {
                    expected: dest.len(),
                    read: total,
                })
            }
            Ok(n) => total += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(())
}
