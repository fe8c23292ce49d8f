//! Variable-length integers
//!
//! Layout (little-endian group order, least significant group first):
//! ┌──────────────────────────────────────────────────────────────┐
//! │ unsigned: [C|vvvvvvv] [C|vvvvvvv] ... [0|vvvvvvv]            │
//! │ signed:   [R|C|vvvvvv] [C|vvvvvvv] ... [0|vvvvvvv]           │
//! └──────────────────────────────────────────────────────────────┘
//! `C` = continuation flag, `R` = reserved (always 0), `v` = value bits.
//!
//! `GroupWidth::Fifteen` uses the same rules with 16-bit little-endian words
//! instead of bytes: 15 value bits plus the flag, and 14 value bits plus flag
//! plus reserved bit in the first signed word.
//!
//! `max_len` adalah byte budget dalam `2..=9`. Berlaku untuk encode dan
//! decode; value yang butuh group lebih banyak dari budget menjadi `Overflow`.

use crate::error::{Error, Result};

/// Smallest accepted byte budget.
pub const MIN_LEN: usize = 2;
/// Largest accepted byte budget. Also the size of [`Encoded`].
pub const MAX_LEN: usize = 9;

/// Width of one group of value bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupWidth {
    /// One byte per group: 7 value bits + continuation flag
    Seven,
    /// One 16-bit little-endian word per group: 15 value bits + flag
    Fifteen,
}

impl GroupWidth {
    /// Value bits per continuation group.
    #[inline(always)]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Seven => 7,
            Self::Fifteen => 15,
        }
    }

    /// Bytes per group on the wire.
    #[inline(always)]
    pub const fn bytes(self) -> usize {
        match self {
            Self::Seven => 1,
            Self::Fifteen => 2,
        }
    }

    #[inline(always)]
    const fn flag(self) -> u64 {
        1 << self.bits()
    }

    #[inline(always)]
    const fn mask(self) -> u64 {
        self.flag() - 1
    }

    /// Groups that fit in a byte budget.
    #[inline(always)]
    const fn budget(self, max_len: usize) -> usize {
        max_len / self.bytes()
    }
}

/// Rejects byte budgets outside `2..=9`.
pub fn check_max_len(max_len: usize) -> Result<()> {
    if !(MIN_LEN..=MAX_LEN).contains(&max_len) {
        return Err(Error::invalid_argument(format!(
            "max_len must be within {}..={}, got {}",
            MIN_LEN, MAX_LEN, max_len
        )));
    }
    Ok(())
}

/// Value yang sudah di-encode, disimpan di stack sampai ditulis sekaligus.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Encoded {
    bytes: [u8; MAX_LEN],
    len: usize,
}

impl Encoded {
    const fn new() -> Self {
        Self {
            bytes: [0u8; MAX_LEN],
            len: 0,
        }
    }

    #[inline]
    fn push(&mut self, width: GroupWidth, group: u64) {
        match width {
            GroupWidth::Seven => {
                self.bytes[self.len] = group as u8;
            }
            GroupWidth::Fifteen => {
                self.bytes[self.len..self.len + 2].copy_from_slice(&(group as u16).to_le_bytes());
            }
        }
        self.len += width.bytes();
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl AsRef<[u8]> for Encoded {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl std::fmt::Debug for Encoded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Encoded").field(&self.as_bytes()).finish()
    }
}

/// Encodes `value` with the fewest groups whose last one has its flag clear.
pub fn encode_unsigned(value: u64, width: GroupWidth, max_len: usize) -> Result<Encoded> {
    check_max_len(max_len)?;
    let budget = width.budget(max_len);

    let mut out = Encoded::new();
    let mut rest = value;
    let mut emitted = 0;
    loop {
        let group = rest & width.mask();
        rest >>= width.bits();
        if rest == 0 {
            out.push(width, group);
            return Ok(out);
        }

        emitted += 1;
        // Jangan pernah emit group terakhir yang masih membawa flag
        if emitted >= budget {
            return Err(Error::Overflow { max_len });
        }
        out.push(width, group | width.flag());
    }
}

/// Sign-extending encoding: first group one value bit short, see module docs.
pub fn encode_signed(value: i64, width: GroupWidth, max_len: usize) -> Result<Encoded> {
    check_max_len(max_len)?;
    let budget = width.budget(max_len);

    let mut out = Encoded::new();
    let mut rest = value;
    let mut group_bits = width.bits() - 1;
    let mut emitted = 0;
    loop {
        let group = (rest as u64) & ((1u64 << group_bits) - 1);
        let sign_set = group & (1u64 << (group_bits - 1)) != 0;
        rest >>= group_bits; // arithmetic shift

        if (rest == 0 && !sign_set) || (rest == -1 && sign_set) {
            out.push(width, group);
            return Ok(out);
        }

        emitted += 1;
        if emitted >= budget {
            return Err(Error::Overflow { max_len });
        }
        out.push(width, group | (1u64 << group_bits));
        group_bits = width.bits();
    }
}

/// Decodes an unsigned value, pulling one group at a time from `next_group`.
///
/// `next_group` should fail with `EndOfStream` when the source runs dry.
pub fn decode_unsigned<F>(width: GroupWidth, max_len: usize, mut next_group: F) -> Result<u64>
where
    F: FnMut() -> Result<u16>,
{
    check_max_len(max_len)?;

    // At most 63 value bits fit in 9 bytes, so the shifts stay below 64
    let mut value = 0u64;
    let mut shift = 0u32;
    for _ in 0..width.budget(max_len) {
        let group = u64::from(next_group()?);
        value |= (group & width.mask()) << shift;
        shift += width.bits();
        if group & width.flag() == 0 {
            return Ok(value);
        }
    }
    Err(Error::Overflow { max_len })
}

/// Decodes a signed value, sign-extending from the accumulated bit count.
pub fn decode_signed<F>(width: GroupWidth, max_len: usize, mut next_group: F) -> Result<i64>
where
    F: FnMut() -> Result<u16>,
{
    check_max_len(max_len)?;

    let first_bits = width.bits() - 1;
    let first = u64::from(next_group()?);
    if first & width.flag() != 0 {
        return Err(Error::InvalidData("reserved bit set in signed varint"));
    }

    let mut value = first & ((1u64 << first_bits) - 1);
    let mut shift = first_bits;
    let mut more = first & (1u64 << first_bits) != 0;

    let mut remaining = width.budget(max_len) - 1;
    while more {
        if remaining == 0 {
            return Err(Error::Overflow { max_len });
        }
        remaining -= 1;

        let group = u64::from(next_group()?);
        value |= (group & width.mask()) << shift;
        shift += width.bits();
        more = group & width.flag() != 0;
    }

    // shift <= 62, so there is always room to extend
    if value & (1u64 << (shift - 1)) != 0 {
        value |= u64::MAX << shift;
    }
    Ok(value as i64)
}

/// Decodes from the front of a byte slice. Returns the value and bytes used.
pub fn decode_unsigned_from_slice(
    bytes: &[u8],
    width: GroupWidth,
    max_len: usize,
) -> Result<(u64, usize)> {
    let mut groups = SliceGroups::new(bytes, width);
    let value = decode_unsigned(width, max_len, || groups.next_group())?;
    Ok((value, groups.consumed))
}

/// Signed counterpart of [`decode_unsigned_from_slice`].
pub fn decode_signed_from_slice(
    bytes: &[u8],
    width: GroupWidth,
    max_len: usize,
) -> Result<(i64, usize)> {
    let mut groups = SliceGroups::new(bytes, width);
    let value = decode_signed(width, max_len, || groups.next_group())?;
    Ok((value, groups.consumed))
}

struct SliceGroups<'a> {
    bytes: &'a [u8],
    width: GroupWidth,
    consumed: usize,
}

impl<'a> SliceGroups<'a> {
    fn new(bytes: &'a [u8], width: GroupWidth) -> Self {
        Self {
            bytes,
            width,
            consumed: 0,
        }
    }

    fn next_group(&mut self) -> Result<u16> {
        let size = self.width.bytes();
        let group = self
            .bytes
            .get(self.consumed..self.consumed + size)
            .ok_or(Error::EndOfStream {
                expected: size,
                read: self.bytes.len().saturating_sub(self.consumed),
            })?;
        self.consumed += size;
        Ok(match self.width {
            GroupWidth::Seven => u16::from(group[0]),
            GroupWidth::Fifteen => u16::from_le_bytes([group[0], group[1]]),
        })
    }
}
