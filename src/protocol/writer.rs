//! Little-endian binary writer
//!
//! Cermin dari [`BinaryReader`](super::BinaryReader). Setiap value dirakit
//! di stack dulu lalu diserahkan ke sink dengan satu `write_all`.

use std::io::Write;

use byteorder::{ByteOrder, LittleEndian};

use super::text::TextEncoding;
use super::varint::{self, GroupWidth};
use crate::error::{Error, Result};

/// Writes primitives, strings and varints to any [`Write`].
pub struct BinaryWriter<W: Write> {
    inner: W,
    encoding: TextEncoding,
    leave_open: bool,
}

impl<W: Write> BinaryWriter<W> {
    /// UTF-8 writer that owns `inner`.
    pub fn new(inner: W) -> Self {
        Self::with_options(inner, TextEncoding::Utf8, false)
    }

    pub fn with_encoding(inner: W, encoding: TextEncoding) -> Self {
        Self::with_options(inner, encoding, false)
    }

    /// With `leave_open`, [`close`](Self::close) hands `inner` back instead
    /// of dropping it.
    pub fn with_options(inner: W, encoding: TextEncoding, leave_open: bool) -> Self {
        Self {
            inner,
            encoding,
            leave_open,
        }
    }

    #[inline]
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Flushes, then drops the sink unless built with `leave_open`.
    pub fn close(mut self) -> Result<Option<W>> {
        self.flush()?;
        Ok(if self.leave_open {
            Some(self.inner)
        } else {
            None
        })
    }

    /// Writes `src[offset..offset + length]`.
    pub fn write(&mut self, src: &[u8], offset: usize, length: usize) -> Result<()> {
        let span = offset
            .checked_add(length)
            .and_then(|end| src.get(offset..end))
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "range {}..{}+{} out of bounds for source of {} bytes",
                    offset,
                    offset,
                    length,
                    src.len()
                ))
            })?;
        self.write_all(span)
    }

    #[inline]
    pub fn write_all(&mut self, src: &[u8]) -> Result<()> {
        self.inner.write_all(src)?;
        Ok(())
    }

    /// Low `width` bytes of `value`, little-endian. Higher bits are dropped.
    pub fn write_uint(&mut self, value: u64, width: usize) -> Result<()> {
        if !(1..=8).contains(&width) {
            return Err(Error::invalid_argument(format!(
                "integer width must be within 1..=8, got {}",
                width
            )));
        }
        let mut buf = [0u8; 8];
        for (index, slot) in buf.iter_mut().take(width).enumerate() {
            *slot = (value >> (index * 8)) as u8;
        }
        self.write_all(&buf[..width])
    }

    /// Two's complement, so the layout matches `write_uint`.
    #[inline]
    pub fn write_int(&mut self, value: i64, width: usize) -> Result<()> {
        self.write_uint(value as u64, width)
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_all(&[value])
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        let mut buf = [0u8; 2];
        LittleEndian::write_u16(&mut buf, value);
        self.write_all(&buf)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, value);
        self.write_all(&buf)
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        let mut buf = [0u8; 8];
        LittleEndian::write_u64(&mut buf, value);
        self.write_all(&buf)
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_u8(value as u8)
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_u16(value as u16)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_u32(value as u32)
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_u64(value as u64)
    }

    /// 4 bytes, IEEE 754 single precision.
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        let mut buf = [0u8; 4];
        LittleEndian::write_f32(&mut buf, value);
        self.write_all(&buf)
    }

    /// 8 bytes, IEEE 754 double precision.
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        let mut buf = [0u8; 8];
        LittleEndian::write_f64(&mut buf, value);
        self.write_all(&buf)
    }

    /// Encodes `value` without prefix or terminator; returns the byte count
    /// the caller needs to frame it.
    pub fn write_string(&mut self, value: &str) -> Result<usize> {
        let bytes = self.encoding.encode(value);
        self.write_all(&bytes)?;
        Ok(bytes.len())
    }

    pub fn write_chars(&mut self, value: &[char]) -> Result<usize> {
        let text: String = value.iter().collect();
        self.write_string(&text)
    }

    pub fn write_varuint7(&mut self, value: u64, max_len: usize) -> Result<usize> {
        self.write_encoded(varint::encode_unsigned(value, GroupWidth::Seven, max_len)?)
    }

    pub fn write_varuint15(&mut self, value: u64, max_len: usize) -> Result<usize> {
        self.write_encoded(varint::encode_unsigned(value, GroupWidth::Fifteen, max_len)?)
    }

    pub fn write_varsint7(&mut self, value: i64, max_len: usize) -> Result<usize> {
        self.write_encoded(varint::encode_signed(value, GroupWidth::Seven, max_len)?)
    }

    pub fn write_varsint15(&mut self, value: i64, max_len: usize) -> Result<usize> {
        self.write_encoded(varint::encode_signed(value, GroupWidth::Fifteen, max_len)?)
    }

    #[inline]
    fn write_encoded(&mut self, encoded: varint::Encoded) -> Result<usize> {
        self.write_all(encoded.as_bytes())?;
        Ok(encoded.len())
    }
}

impl<W: Write> std::fmt::Debug for BinaryWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryWriter")
            .field("encoding", &self.encoding)
            .field("leave_open", &self.leave_open)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::BinaryReader;
    use std::io::Cursor;

    fn written(f: impl FnOnce(&mut BinaryWriter<Vec<u8>>) -> Result<()>) -> Vec<u8> {
        let mut writer = BinaryWriter::new(Vec::new());
        f(&mut writer).unwrap();
        writer.into_inner()
    }

    #[test]
    fn test_fixed_width_layout() {
        assert_eq!(written(|w| w.write_u16(0x1234)), vec![0x34, 0x12]);
        assert_eq!(written(|w| w.write_i32(-2)), vec![0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(written(|w| w.write_uint(0x0102_0304, 3)), vec![0x04, 0x03, 0x02]);
        assert_eq!(written(|w| w.write_int(-1, 2)), vec![0xFF, 0xFF]);
    }

    #[test]
    fn test_float_widths() {
        assert_eq!(written(|w| w.write_f32(1.0)).len(), 4);
        assert_eq!(written(|w| w.write_f64(1.0)).len(), 8);
        assert_eq!(written(|w| w.write_f32(1.0)), 1.0f32.to_le_bytes().to_vec());
        assert_eq!(written(|w| w.write_f64(-0.5)), (-0.5f64).to_le_bytes().to_vec());
    }

    #[test]
    fn test_varint_layouts() {
        assert_eq!(written(|w| w.write_varuint7(0, 9).map(drop)), vec![0x00]);
        assert_eq!(written(|w| w.write_varuint7(127, 9).map(drop)), vec![0x7F]);
        assert_eq!(written(|w| w.write_varuint7(128, 9).map(drop)), vec![0x80, 0x01]);
        assert_eq!(written(|w| w.write_varsint7(-1, 9).map(drop)), vec![0x3F]);
    }

    #[test]
    fn test_overflow_writes_nothing() {
        let mut writer = BinaryWriter::new(Vec::new());
        assert!(matches!(
            writer.write_varuint7(u64::MAX, 3),
            Err(Error::Overflow { max_len: 3 })
        ));
        assert!(matches!(
            writer.write_varsint15(1, 1),
            Err(Error::InvalidArgument(_))
        ));
        assert!(writer.get_ref().is_empty());
    }

    #[test]
    fn test_string_has_no_prefix() {
        let mut writer = BinaryWriter::with_encoding(Vec::new(), TextEncoding::Latin1);
        assert_eq!(writer.write_string("café").unwrap(), 4);
        assert_eq!(writer.write_chars(&['!', '?']).unwrap(), 2);
        assert_eq!(writer.into_inner(), b"caf\xE9!?".to_vec());
    }

    #[test]
    fn test_write_span() {
        let mut writer = BinaryWriter::new(Vec::new());
        writer.write(b"abcdef", 2, 3).unwrap();
        assert!(matches!(
            writer.write(b"abc", 2, 2),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(writer.into_inner(), b"cde".to_vec());
    }

    #[test]
    fn test_mixed_record_round_trip() {
        let mut writer = BinaryWriter::new(Vec::new());
        writer.write_u8(7).unwrap();
        writer.write_i16(-300).unwrap();
        writer.write_f32(3.25).unwrap();
        writer.write_varuint7(1_000_000, 4).unwrap();
        let name_len = writer.write_string("ringsock").unwrap();
        writer.write_varsint15(-70_000, 6).unwrap();
        writer.write_f64(std::f64::consts::PI).unwrap();

        let mut reader = BinaryReader::new(Cursor::new(writer.into_inner()));
        assert_eq!(reader.read_u8().unwrap(), 7);
        assert_eq!(reader.read_i16().unwrap(), -300);
        assert_eq!(reader.read_f32().unwrap(), 3.25);
        assert_eq!(reader.read_varuint7(4).unwrap(), 1_000_000);
        assert_eq!(reader.read_string(name_len).unwrap(), "ringsock");
        assert_eq!(reader.read_varsint15(6).unwrap(), -70_000);
        assert_eq!(reader.read_f64().unwrap(), std::f64::consts::PI);
        assert!(matches!(reader.read_u8(), Err(Error::EndOfStream { .. })));
    }

    #[test]
    fn test_close_flushes_and_respects_leave_open() {
        let writer = BinaryWriter::with_options(Vec::new(), TextEncoding::Utf8, true);
        assert!(writer.close().unwrap().is_some());

        let writer = BinaryWriter::new(Vec::new());
        assert!(writer.close().unwrap().is_none());
    }
}
