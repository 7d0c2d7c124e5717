//! Word-aligned fixed-width packing ("non-crossing" layout).
//!
//! Like [`crate::crossing`], every element takes `k` bits, but no element straddles a
//! word boundary: when the next field would cross one, the cursor skips to the start
//! of the next word and the skipped bits stay zero.
//!
//! The start offsets are a pure function of `(k, n)` (see [`start_offsets`]), so only
//! `k`, `n` and the words are persisted; the offset table is rebuilt on load.
//!
//! For `k > 32` every field would cross, so the cursor always advances: each element
//! starts on the word boundary after the previous one ends, and the first word is
//! left empty.

use crate::bits::{self, pack, unpack, words_needed, WORD_BITS};
use crate::error::{Error, Result};
use crate::format::{self, Mode};

/// Fixed-width packed integer array whose elements never straddle a word.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NonCrossingPacker {
    k: usize,
    n: usize,
    words: Vec<u32>,
    start_bits: Vec<usize>,
}

/// Compute the start bit of each of `n` elements of width `k`.
///
/// The cursor starts at 0; before each element, if the field would run past the end
/// of the current word, the cursor moves to the next word boundary. The rule applies
/// even when the cursor is already aligned, which only happens for `k > 32`.
pub fn start_offsets(k: usize, n: usize) -> Vec<usize> {
    let mut out = Vec::with_capacity(n);
    let mut pos = 0usize;
    for _ in 0..n {
        let bit_in_word = pos % WORD_BITS;
        if bit_in_word + k > WORD_BITS {
            pos = (pos / WORD_BITS + 1) * WORD_BITS;
        }
        out.push(pos);
        pos += k;
    }
    out
}

fn end_bit(start_bits: &[usize], k: usize) -> usize {
    start_bits.last().map_or(0, |&s| s + k)
}

impl NonCrossingPacker {
    /// Pack `values` using the narrowest width that fits their maximum.
    pub fn from_values(values: &[u64]) -> Result<Self> {
        Self::with_width(bits::fit_width(values), values)
    }

    /// Pack signed input, rejecting negative values.
    pub fn from_list(values: &[i64]) -> Result<Self> {
        Self::from_values(&bits::non_negative(values)?)
    }

    /// Pack `values` at an externally chosen width `k`.
    pub fn with_width(k: usize, values: &[u64]) -> Result<Self> {
        if k > bits::MAX_WIDTH {
            return Err(Error::WidthTooLarge(k));
        }
        if k == 0 && !values.is_empty() {
            return Err(Error::ZeroWidth(values.len()));
        }
        bits::check_fits(values, k)?;

        let start_bits = start_offsets(k, values.len());
        let mut words = Vec::with_capacity(words_needed(end_bit(&start_bits, k)));
        for (&x, &s) in values.iter().zip(&start_bits) {
            pack(&mut words, s, x, k)?;
        }
        Ok(Self {
            k,
            n: values.len(),
            words,
            start_bits,
        })
    }

    /// Reconstruct a structure from `k`, `n` and its words, recomputing the offsets.
    pub fn from_parts(k: usize, n: usize, words: Vec<u32>) -> Result<Self> {
        if k > bits::MAX_WIDTH {
            return Err(Error::WidthTooLarge(k));
        }
        if k == 0 && n > 0 {
            return Err(Error::ZeroWidth(n));
        }
        // Every element occupies at least one stored bit.
        if n > words.len().saturating_mul(WORD_BITS) {
            return Err(Error::InvalidEncoding(format!(
                "non-crossing n ({n}) too large for {} words",
                words.len()
            )));
        }
        let start_bits = start_offsets(k, n);
        let expected = words_needed(end_bit(&start_bits, k));
        if words.len() != expected {
            return Err(Error::InvalidEncoding(format!(
                "non-crossing layout with k={k}, n={n} needs {expected} words, got {}",
                words.len()
            )));
        }
        Ok(Self {
            k,
            n,
            words,
            start_bits,
        })
    }

    /// Return the number of elements.
    pub fn len(&self) -> usize {
        self.n
    }

    /// Return true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Bits per element.
    pub fn width(&self) -> usize {
        self.k
    }

    /// The packed words.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Start bit of every element.
    pub fn start_bits(&self) -> &[usize] {
        &self.start_bits
    }

    /// Return the value at index `i`.
    pub fn get(&self, i: usize) -> Result<u64> {
        let &s = self.start_bits.get(i).ok_or(Error::IndexOutOfBounds {
            index: i,
            len: self.n,
        })?;
        Ok(unpack(&self.words, s, self.k))
    }

    /// Iterate over all values in order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = u64> + '_ {
        self.start_bits
            .iter()
            .map(move |&s| unpack(&self.words, s, self.k))
    }

    /// Decode every value.
    pub fn to_list(&self) -> Vec<u64> {
        self.iter().collect()
    }

    /// Number of bits spanned by the layout, padding included.
    pub fn size_in_bits(&self) -> usize {
        end_bit(&self.start_bits, self.k)
    }

    /// Approximate heap memory usage in bytes.
    pub fn heap_bytes(&self) -> usize {
        self.words.capacity() * 4 + self.start_bits.capacity() * std::mem::size_of::<usize>()
    }

    /// Serialize to the crossing-family binary format (mode 1).
    ///
    /// The offset table is not written.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        format::encode(Mode::NonCrossing, self.k, self.n, &self.words)
    }

    /// Deserialize from [`Self::to_bytes`] output.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let saved = format::decode(bytes)?;
        if saved.mode != Mode::NonCrossing {
            return Err(Error::InvalidEncoding(format!(
                "expected a non-crossing blob, found {}",
                saved.mode
            )));
        }
        Self::from_parts(saved.k, saved.n, saved.words)
    }
}
