//! Bit-level read/write primitives over a growable array of 32-bit words.
//!
//! Bits are numbered little-endian: bit 0 is the least-significant bit of word 0,
//! bit 32 the least-significant bit of word 1, and so on. A field of `width` bits
//! written at absolute bit `start` occupies bits `[start, start + width)`, with its
//! least-significant bit at `start`. Fields may straddle word boundaries.
//!
//! Every packer in this crate bottoms out in [`pack`] and [`unpack`], so both walk
//! the field in chunks bounded by the next word boundary and touch each word once.

use crate::error::{Error, Result};

/// Number of bits in one storage word.
pub const WORD_BITS: usize = 32;

/// Widest field [`pack`] and [`unpack`] accept.
pub const MAX_WIDTH: usize = 64;

/// Return the number of words needed to address `total_bits` bits.
#[inline]
pub const fn words_needed(total_bits: usize) -> usize {
    total_bits.div_ceil(WORD_BITS)
}

/// Return the number of significant bits in `x` (0 for `x == 0`).
#[inline]
pub const fn bit_length(x: u64) -> usize {
    (u64::BITS - x.leading_zeros()) as usize
}

/// Return `ceil(log2(m))`, with `ceil_log2(0) == ceil_log2(1) == 0`.
#[inline]
pub const fn ceil_log2(m: u64) -> usize {
    if m <= 1 {
        0
    } else {
        bit_length(m - 1)
    }
}

/// Return the fixed width used for `values`: `max(1, bit_length(max))`, or 0 if empty.
pub fn fit_width(values: &[u64]) -> usize {
    values
        .iter()
        .copied()
        .max()
        .map_or(0, |mx| bit_length(mx).max(1))
}

/// Convert signed input to unsigned values, rejecting the first negative one.
pub(crate) fn non_negative(values: &[i64]) -> Result<Vec<u64>> {
    values
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            u64::try_from(value).map_err(|_| Error::NegativeValue { index, value })
        })
        .collect()
}

/// Check that every value fits in `width` bits.
pub(crate) fn check_fits(values: &[u64], width: usize) -> Result<()> {
    if width >= MAX_WIDTH {
        return Ok(());
    }
    match values.iter().find(|&&v| v >> width != 0) {
        Some(&value) => Err(Error::ValueTooWide { value, width }),
        None => Ok(()),
    }
}

#[inline(always)]
const fn low_mask(bits: usize) -> u32 {
    if bits >= WORD_BITS {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}

/// Write `value` into `width` bits starting at absolute bit `start_bit`.
///
/// `words` is extended with zero words so that `start_bit + width` bits are
/// addressable. The target bits are cleared before the value is written, so a
/// second write at the same position overwrites the first.
///
/// A `width` of 0 is a no-op.
///
/// # Errors
///
/// - [`Error::WidthTooLarge`] if `width > 64`.
/// - [`Error::ValueTooWide`] if `value >= 2^width`.
pub fn pack(words: &mut Vec<u32>, start_bit: usize, value: u64, width: usize) -> Result<()> {
    if width > MAX_WIDTH {
        return Err(Error::WidthTooLarge(width));
    }
    if width == 0 {
        return Ok(());
    }
    if width < MAX_WIDTH && value >> width != 0 {
        return Err(Error::ValueTooWide { value, width });
    }

    let needed = words_needed(start_bit + width);
    if needed > words.len() {
        words.resize(needed, 0);
    }

    let mut pos = start_bit;
    let mut remaining = width;
    let mut val = value;
    while remaining > 0 {
        let (wi, bo) = (pos / WORD_BITS, pos % WORD_BITS);
        let chunk = remaining.min(WORD_BITS - bo);
        let mask = low_mask(chunk);
        words[wi] = (words[wi] & !(mask << bo)) | (((val as u32) & mask) << bo);
        pos += chunk;
        remaining -= chunk;
        val >>= chunk;
    }
    Ok(())
}

/// Read `width` bits starting at absolute bit `start_bit`.
///
/// Bits beyond the end of `words` read as zero. A `width` of 0 returns 0.
///
/// # Panics
///
/// Panics if `width > 64`.
#[inline]
pub fn unpack(words: &[u32], start_bit: usize, width: usize) -> u64 {
    assert!(width <= MAX_WIDTH, "unpack width {width} exceeds 64");

    let mut pos = start_bit;
    let mut remaining = width;
    let mut out = 0u64;
    let mut shift = 0;
    while remaining > 0 {
        let (wi, bo) = (pos / WORD_BITS, pos % WORD_BITS);
        let chunk = remaining.min(WORD_BITS - bo);
        let piece = words.get(wi).map_or(0, |&w| (w >> bo) & low_mask(chunk));
        out |= u64::from(piece) << shift;
        pos += chunk;
        shift += chunk;
        remaining -= chunk;
    }
    out
}
