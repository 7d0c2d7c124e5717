//! Contiguous fixed-width packing ("crossing" layout).
//!
//! Every element takes exactly `k` bits and element `i` starts at bit `i * k`, so
//! fields freely straddle word boundaries.
//!
//! # Theory
//!
//! For $n$ values whose maximum is $u$, `k = max(1, ⌈lg(u + 1)⌉)` and the layout
//! uses exactly $\lceil nk / 32 \rceil$ words. Access is a single shift-and-mask over
//! at most three words, so `get` is $O(1)$.

use crate::bits::{self, pack, unpack, words_needed};
use crate::error::{Error, Result};
use crate::format::{self, Mode};

/// Fixed-width packed integer array without padding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossingPacker {
    k: usize,
    n: usize,
    words: Vec<u32>,
}

impl CrossingPacker {
    /// Pack `values` using the narrowest width that fits their maximum.
    ///
    /// An empty slice yields `k == 0` and no words.
    pub fn from_values(values: &[u64]) -> Result<Self> {
        Self::with_width(bits::fit_width(values), values)
    }

    /// Pack signed input, rejecting negative values.
    pub fn from_list(values: &[i64]) -> Result<Self> {
        Self::from_values(&bits::non_negative(values)?)
    }

    /// Pack `values` at an externally chosen width `k`.
    ///
    /// # Errors
    ///
    /// - [`Error::WidthTooLarge`] if `k > 64`.
    /// - [`Error::ValueTooWide`] if any value needs more than `k` bits.
    pub fn with_width(k: usize, values: &[u64]) -> Result<Self> {
        if k > bits::MAX_WIDTH {
            return Err(Error::WidthTooLarge(k));
        }
        if k == 0 && !values.is_empty() {
            return Err(Error::ZeroWidth(values.len()));
        }
        bits::check_fits(values, k)?;

        let n = values.len();
        let mut words = Vec::with_capacity(words_needed(n * k));
        for (i, &x) in values.iter().enumerate() {
            pack(&mut words, i * k, x, k)?;
        }
        Ok(Self { k, n, words })
    }

    /// Reconstruct a structure from its persisted parts.
    ///
    /// This is primarily intended for deserialization.
    pub fn from_parts(k: usize, n: usize, words: Vec<u32>) -> Result<Self> {
        if k > bits::MAX_WIDTH {
            return Err(Error::WidthTooLarge(k));
        }
        if k == 0 && n > 0 {
            return Err(Error::ZeroWidth(n));
        }
        let expected = words_needed(n.checked_mul(k).ok_or_else(|| {
            Error::InvalidEncoding(format!("n ({n}) * k ({k}) overflows"))
        })?);
        if words.len() != expected {
            return Err(Error::InvalidEncoding(format!(
                "crossing layout with k={k}, n={n} needs {expected} words, got {}",
                words.len()
            )));
        }
        Ok(Self { k, n, words })
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

    /// Return the value at index `i`.
    pub fn get(&self, i: usize) -> Result<u64> {
        if i >= self.n {
            return Err(Error::IndexOutOfBounds {
                index: i,
                len: self.n,
            });
        }
        Ok(self.decode(i))
    }

    #[inline]
    fn decode(&self, i: usize) -> u64 {
        unpack(&self.words, i * self.k, self.k)
    }

    /// Iterate over all values in order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = u64> + '_ {
        (0..self.n).map(move |i| self.decode(i))
    }

    /// Decode every value.
    pub fn to_list(&self) -> Vec<u64> {
        self.iter().collect()
    }

    /// Number of payload bits (`n * k`).
    pub fn size_in_bits(&self) -> usize {
        self.n * self.k
    }

    /// Approximate heap memory usage in bytes.
    pub fn heap_bytes(&self) -> usize {
        self.words.capacity() * 4
    }

    /// Serialize to the crossing-family binary format (mode 0).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        format::encode(Mode::Crossing, self.k, self.n, &self.words)
    }

    /// Deserialize from [`Self::to_bytes`] output.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let saved = format::decode(bytes)?;
        if saved.mode != Mode::Crossing {
            return Err(Error::InvalidEncoding(format!(
                "expected a crossing blob, found {}",
                saved.mode
            )));
        }
        Self::from_parts(saved.k, saved.n, saved.words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list() {
        let bp = CrossingPacker::from_values(&[]).unwrap();
        assert_eq!(bp.width(), 0);
        assert_eq!(bp.len(), 0);
        assert!(bp.words().is_empty());
        assert!(bp.to_list().is_empty());
        assert!(matches!(
            bp.get(0),
            Err(Error::IndexOutOfBounds { index: 0, len: 0 })
        ));
    }

    #[test]
    fn basic_12bit_roundtrip() {
        let nums = [1, 5, 8, 15, 31, 255, 1023, 4095];
        let bp = CrossingPacker::from_values(&nums).unwrap();
        assert_eq!(bp.width(), 12);
        assert_eq!(bp.len(), nums.len());
        assert_eq!(bp.words().len(), 3);
        assert_eq!(bp.to_list(), nums);
        assert_eq!(bp.get(3).unwrap(), 15);
        for (i, &x) in nums.iter().enumerate() {
            assert_eq!(bp.get(i).unwrap(), x);
        }
    }

    #[test]
    fn elements_straddle_words() {
        let nums = [4095, 0, 2048, 7, 123, 4095, 1, 33];
        let bp = CrossingPacker::from_values(&nums).unwrap();
        assert_eq!(bp.width(), 12);
        // Element 2 sits at bits 24..36.
        assert_eq!(bp.get(2).unwrap(), 2048);
        assert_eq!(bp.to_list(), nums);
    }

    #[test]
    fn all_zeros_use_one_bit() {
        let bp = CrossingPacker::from_values(&[0, 0, 0]).unwrap();
        assert_eq!(bp.width(), 1);
        assert_eq!(bp.words().len(), 1);
        assert_eq!(bp.to_list(), vec![0, 0, 0]);
    }

    #[test]
    fn wide_values() {
        let nums = [u64::MAX, 0, 1 << 63, 12345];
        let bp = CrossingPacker::from_values(&nums).unwrap();
        assert_eq!(bp.width(), 64);
        assert_eq!(bp.words().len(), 8);
        assert_eq!(bp.to_list(), nums);
    }

    #[test]
    fn negative_not_supported() {
        let e = CrossingPacker::from_list(&[1, -2, 3]).unwrap_err();
        assert!(matches!(e, Error::NegativeValue { index: 1, value: -2 }));
    }

    #[test]
    fn explicit_width_must_fit() {
        let e = CrossingPacker::with_width(3, &[1, 8]).unwrap_err();
        assert!(matches!(e, Error::ValueTooWide { value: 8, width: 3 }));

        assert!(matches!(
            CrossingPacker::with_width(0, &[0]),
            Err(Error::ZeroWidth(1))
        ));

        let bp = CrossingPacker::with_width(10, &[1, 8]).unwrap();
        assert_eq!(bp.width(), 10);
        assert_eq!(bp.to_list(), vec![1, 8]);
    }

    #[test]
    fn from_parts_checks_word_count() {
        assert!(CrossingPacker::from_parts(12, 8, vec![0; 2]).is_err());
        assert!(CrossingPacker::from_parts(65, 0, vec![]).is_err());
        let bp = CrossingPacker::from_parts(12, 8, vec![0; 3]).unwrap();
        assert_eq!(bp.to_list(), vec![0; 8]);
    }

    #[test]
    fn heap_bytes_covers_words() {
        let bp = CrossingPacker::from_values(&[4095; 100]).unwrap();
        assert_eq!(bp.words().len(), 38);
        assert!(bp.heap_bytes() >= 38 * 4);
        assert_eq!(CrossingPacker::default().heap_bytes(), 0);
    }

    #[test]
    fn bytes_roundtrip() {
        let nums = [7, 334, 1, 2];
        let bp = CrossingPacker::from_values(&nums).unwrap();
        let bytes = bp.to_bytes().unwrap();
        assert_eq!(bytes.len(), format::HEADER_LEN + bp.words().len() * 4);
        let bp2 = CrossingPacker::from_bytes(&bytes).unwrap();
        assert_eq!(bp, bp2);
    }
}
