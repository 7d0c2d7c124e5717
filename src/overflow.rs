//! Two-tier packing with an overflow side table.
//!
//! Most integer arrays are dominated by small values with a few outliers. Sizing a
//! fixed-width layout to the largest value wastes bits on every small one; this
//! layout instead stores each element in a narrow *slot* and moves values that do
//! not fit into a separate *overflow area*.
//!
//! # Layout
//!
//! Every element owns a slot of `slot_w = 1 + max(kprime, idx_bits)` bits starting
//! at bit `i * slot_w`:
//!
//! ```text
//!  bit slot_w-1            bits 0 .. slot_w-1
//! +------------+---------------------------------------------+
//! |   flag     | payload (zero-padded above the active field) |
//! +------------+---------------------------------------------+
//!   0 => payload is the value itself, on `kprime` bits
//!   1 => payload is an overflow index, on `idx_bits` bits
//! ```
//!
//! Overflow values are packed back to back on `k_over` bits each, one entry per
//! over-threshold occurrence in input order. Entries are not deduplicated: the
//! `j`-th flagged slot always refers to overflow entry `j`.
//!
//! # Width search
//!
//! With `K` the bit length of the largest value, the slot width is chosen by
//! minimizing, over `kprime ∈ [1, K]`,
//!
//! $$\textrm{cost}(k') = n \cdot \textrm{slot\_w}(k') + c(k') \cdot k_\textrm{over}(k')$$
//!
//! where $c(k')$ counts values $\geq 2^{k'}$. Values are bucketed by bit length once,
//! after which each candidate costs $O(1)$, so the search is $O(n + K)$. Ties keep
//! the smallest `kprime`. At `kprime = K` nothing overflows, so the chosen cost never
//! exceeds $n (1 + K)$ bits.

use crate::bits::{self, bit_length, ceil_log2, pack, unpack, words_needed, MAX_WIDTH};
use crate::error::{Error, Result};
use crate::format::{self, ByteReader};

/// Parameters selected by the width search for one array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WidthChoice {
    /// Inline value width.
    pub kprime: usize,
    /// Overflow index width (0 if nothing overflows).
    pub idx_bits: usize,
    /// Slot width, flag included.
    pub slot_w: usize,
    /// Overflow value width (0 if nothing overflows).
    pub k_over: usize,
    /// Number of overflow entries.
    pub overflow_count: usize,
    /// Total encoded payload bits.
    pub cost: u128,
}

/// Counts of values per bit length.
#[derive(Debug, Clone)]
pub struct LengthHistogram {
    counts: [usize; MAX_WIDTH + 1],
    n: usize,
    max_len: usize,
}

impl LengthHistogram {
    /// Bucket `values` by bit length.
    pub fn new(values: &[u64]) -> Self {
        let mut counts = [0usize; MAX_WIDTH + 1];
        let mut max_len = 0;
        for &v in values {
            let len = bit_length(v);
            counts[len] += 1;
            max_len = max_len.max(len);
        }
        Self {
            counts,
            n: values.len(),
            max_len,
        }
    }

    /// Bit length of the largest value (`K`).
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Evaluate the layout at a given `kprime` in `[1, 64]`.
    pub fn evaluate(&self, kprime: usize) -> WidthChoice {
        let overflow_count: usize = self.counts[(kprime + 1).min(MAX_WIDTH + 1)..]
            .iter()
            .sum();
        self.choice(kprime, overflow_count)
    }

    fn choice(&self, kprime: usize, overflow_count: usize) -> WidthChoice {
        let (idx_bits, k_over) = if overflow_count > 0 {
            (ceil_log2(overflow_count as u64).max(1), self.max_len)
        } else {
            (0, 0)
        };
        let slot_w = 1 + kprime.max(idx_bits);
        let cost = self.n as u128 * slot_w as u128 + overflow_count as u128 * k_over as u128;
        WidthChoice {
            kprime,
            idx_bits,
            slot_w,
            k_over,
            overflow_count,
            cost,
        }
    }

    /// Find the cheapest `kprime` in `[1, max(1, K)]`.
    pub fn best(&self) -> WidthChoice {
        let top = self.max_len.max(1);
        // Walk kprime downwards so the overflow count is a running suffix sum, then
        // keep the smallest kprime among equal costs.
        let mut overflow_count = 0;
        let mut best = self.choice(top, 0);
        for kprime in (1..top).rev() {
            overflow_count += self.counts[kprime + 1];
            let cand = self.choice(kprime, overflow_count);
            if cand.cost <= best.cost {
                best = cand;
            }
        }
        best
    }
}

/// Run the width search over `values`.
///
/// An empty input yields the all-zero choice.
pub fn choose_width(values: &[u64]) -> WidthChoice {
    if values.is_empty() {
        return WidthChoice::default();
    }
    LengthHistogram::new(values).best()
}

/// Packed integer array with narrow slots and an overflow area.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverflowPacker {
    kprime: usize,
    idx_bits: usize,
    slot_w: usize,
    k_over: usize,
    n: usize,
    m: usize,
    words: Vec<u32>,
    overflow_words: Vec<u32>,
}

impl OverflowPacker {
    /// Pack `values` with the cheapest slot width.
    pub fn from_values(values: &[u64]) -> Result<Self> {
        Self::with_choice(choose_width(values), values)
    }

    /// Pack signed input, rejecting negative values.
    pub fn from_list(values: &[i64]) -> Result<Self> {
        Self::from_values(&bits::non_negative(values)?)
    }

    /// Pack `values` with a fixed inline width `kprime` instead of searching.
    pub fn with_kprime(kprime: usize, values: &[u64]) -> Result<Self> {
        if kprime == 0 && !values.is_empty() {
            return Err(Error::ZeroWidth(values.len()));
        }
        if kprime > MAX_WIDTH {
            return Err(Error::WidthTooLarge(kprime));
        }
        if values.is_empty() {
            return Ok(Self::default());
        }
        Self::with_choice(LengthHistogram::new(values).evaluate(kprime), values)
    }

    fn with_choice(choice: WidthChoice, values: &[u64]) -> Result<Self> {
        let WidthChoice {
            kprime,
            idx_bits,
            slot_w,
            k_over,
            overflow_count,
            ..
        } = choice;
        let n = values.len();
        if n == 0 {
            return Ok(Self::default());
        }

        let mut words = Vec::with_capacity(words_needed(n * slot_w));
        let mut overflow_words = Vec::with_capacity(words_needed(overflow_count * k_over));
        let mut m = 0usize;
        for (i, &x) in values.iter().enumerate() {
            let base = i * slot_w;
            if bit_length(x) > kprime {
                pack(&mut words, base, m as u64, idx_bits)?;
                pack(&mut words, base + slot_w - 1, 1, 1)?;
                pack(&mut overflow_words, m * k_over, x, k_over)?;
                m += 1;
            } else {
                pack(&mut words, base, x, kprime)?;
                pack(&mut words, base + slot_w - 1, 0, 1)?;
            }
        }
        debug_assert_eq!(m, overflow_count);

        Ok(Self {
            kprime,
            idx_bits,
            slot_w,
            k_over,
            n,
            m,
            words,
            overflow_words,
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

    /// Inline value width.
    pub fn kprime(&self) -> usize {
        self.kprime
    }

    /// Overflow index width.
    pub fn idx_bits(&self) -> usize {
        self.idx_bits
    }

    /// Slot width, flag included.
    pub fn slot_width(&self) -> usize {
        self.slot_w
    }

    /// Overflow value width.
    pub fn overflow_width(&self) -> usize {
        self.k_over
    }

    /// Number of overflow entries.
    pub fn overflow_len(&self) -> usize {
        self.m
    }

    /// The slot words.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// The overflow area words.
    pub fn overflow_words(&self) -> &[u32] {
        &self.overflow_words
    }

    /// Return the value at index `i`.
    pub fn get(&self, i: usize) -> Result<u64> {
        if i >= self.n {
            return Err(Error::IndexOutOfBounds {
                index: i,
                len: self.n,
            });
        }
        self.decode(i)
    }

    fn decode(&self, i: usize) -> Result<u64> {
        let base = i * self.slot_w;
        if unpack(&self.words, base + self.slot_w - 1, 1) == 0 {
            return Ok(unpack(&self.words, base, self.kprime));
        }
        if self.m == 0 || self.k_over == 0 {
            return Err(Error::MissingOverflowArea);
        }
        let idx = unpack(&self.words, base, self.idx_bits);
        if idx >= self.m as u64 {
            return Err(Error::OverflowIndexOutOfRange {
                index: idx,
                len: self.m,
            });
        }
        Ok(unpack(
            &self.overflow_words,
            idx as usize * self.k_over,
            self.k_over,
        ))
    }

    /// Iterate over all values in order.
    ///
    /// # Panics
    ///
    /// Panics if a slot fails to decode. Construction and loading both validate every
    /// slot, so this only happens for a structure assembled by hand.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = u64> + '_ {
        (0..self.n).map(move |i| {
            self.decode(i)
                .expect("every flagged slot references a stored overflow entry")
        })
    }

    /// Decode every value.
    ///
    /// # Panics
    ///
    /// Same conditions as [`Self::iter`]; use [`Self::try_to_list`] to get the error.
    pub fn to_list(&self) -> Vec<u64> {
        self.iter().collect()
    }

    /// Decode every value, stopping at the first slot that fails to decode.
    pub fn try_to_list(&self) -> Result<Vec<u64>> {
        (0..self.n).map(|i| self.decode(i)).collect()
    }

    /// Encoded payload bits: slots plus overflow entries.
    pub fn size_in_bits(&self) -> usize {
        self.n * self.slot_w + self.m * self.k_over
    }

    /// Approximate heap memory usage in bytes.
    pub fn heap_bytes(&self) -> usize {
        (self.words.capacity() + self.overflow_words.capacity()) * 4
    }

    /// Serialize to the overflow binary format.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let n: u32 = format::narrow("n", self.n)?;
        let mut out = Vec::with_capacity(
            format::OVERFLOW_HEADER_LEN + (self.words.len() + self.overflow_words.len()) * 4,
        );
        out.extend_from_slice(format::OVERFLOW_MAGIC);
        out.push(format::OVERFLOW_VERSION);
        out.extend_from_slice(&n.to_le_bytes());
        if self.n == 0 {
            return Ok(out);
        }

        let main_len: u32 = format::narrow("main_word_count", self.words.len())?;
        let over_len: u32 = format::narrow("overflow_word_count", self.overflow_words.len())?;
        for (field, w) in [
            ("kprime", self.kprime),
            ("idx_bits", self.idx_bits),
            ("slot_w", self.slot_w),
            ("k_over", self.k_over),
        ] {
            out.push(format::narrow::<u8>(field, w)?);
        }
        out.extend_from_slice(&main_len.to_le_bytes());
        out.extend_from_slice(&over_len.to_le_bytes());
        format::put_words(&mut out, &self.words);
        format::put_words(&mut out, &self.overflow_words);
        Ok(out)
    }

    /// Deserialize from [`Self::to_bytes`] output.
    ///
    /// Header widths and word counts are checked against each other, and every slot
    /// is scanned to rebuild the overflow count and confirm its indices.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(bytes);
        r.require(format::OVERFLOW_EMPTY_LEN)?;
        let magic = r.take(4)?;
        if magic != format::OVERFLOW_MAGIC {
            return Err(Error::BadMagic(magic.to_vec()));
        }
        let version = r.u8()?;
        if version != format::OVERFLOW_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        let n = r.u32()? as usize;
        if n == 0 {
            r.finish("empty overflow header")?;
            return Ok(Self::default());
        }

        r.require(format::OVERFLOW_HEADER_LEN - format::OVERFLOW_EMPTY_LEN)?;
        let kprime = r.u8()? as usize;
        let idx_bits = r.u8()? as usize;
        let slot_w = r.u8()? as usize;
        let k_over = r.u8()? as usize;
        let main_len = r.u32()? as usize;
        let over_len = r.u32()? as usize;

        if kprime == 0 || kprime > MAX_WIDTH || idx_bits > MAX_WIDTH || k_over > MAX_WIDTH {
            return Err(Error::InvalidEncoding(format!(
                "bad widths kprime={kprime} idx_bits={idx_bits} k_over={k_over}"
            )));
        }
        if slot_w != 1 + kprime.max(idx_bits) {
            return Err(Error::InvalidEncoding(format!(
                "slot_w ({slot_w}) != 1 + max(kprime={kprime}, idx_bits={idx_bits})"
            )));
        }
        if main_len != words_needed(n * slot_w) {
            return Err(Error::InvalidEncoding(format!(
                "{n} slots of {slot_w} bits need {} words, header says {main_len}",
                words_needed(n * slot_w)
            )));
        }
        r.require((main_len + over_len) * 4)?;
        let words = r.words(main_len)?;
        let overflow_words = r.words(over_len)?;
        r.finish("overflow words")?;

        let mut m = 0usize;
        for i in 0..n {
            let base = i * slot_w;
            if unpack(&words, base + slot_w - 1, 1) == 1 {
                let idx = unpack(&words, base, idx_bits);
                if idx != m as u64 {
                    return Err(Error::InvalidEncoding(format!(
                        "slot {i} refers to overflow entry {idx}, expected {m}"
                    )));
                }
                m += 1;
            }
        }
        if m > 0 && (k_over == 0 || idx_bits == 0) {
            return Err(Error::MissingOverflowArea);
        }
        if over_len != words_needed(m * k_over) {
            return Err(Error::InvalidEncoding(format!(
                "{m} overflow entries of {k_over} bits need {} words, header says {over_len}",
                words_needed(m * k_over)
            )));
        }

        Ok(Self {
            kprime,
            idx_bits,
            slot_w,
            k_over,
            n,
            m,
            words,
            overflow_words,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_overflow_example() {
        let nums = [1, 2, 3, 1024, 4, 5, 2048];
        let bp = OverflowPacker::from_values(&nums).unwrap();
        assert_eq!(bp.len(), nums.len());
        assert_eq!(bp.overflow_len(), 2);
        assert_eq!(bp.kprime(), 3);
        assert_eq!(bp.idx_bits(), 1);
        assert_eq!(bp.slot_width(), 4);
        assert_eq!(bp.overflow_width(), 12);
        assert_eq!(bp.size_in_bits(), 7 * 4 + 2 * 12);
        assert_eq!(bp.to_list(), nums);
        for (i, &v) in nums.iter().enumerate() {
            assert_eq!(bp.get(i).unwrap(), v);
        }
    }

    #[test]
    fn search_costs_match_hand_computation() {
        let h = LengthHistogram::new(&[1, 2, 3, 1024, 4, 5, 2048]);
        assert_eq!(h.max_len(), 12);
        // kprime=1: six values >= 2, 3 index bits, slot of 4.
        assert_eq!(h.evaluate(1).cost, 7 * 4 + 6 * 12);
        assert_eq!(h.evaluate(2).cost, 7 * 3 + 4 * 12);
        assert_eq!(h.evaluate(3).cost, 7 * 4 + 2 * 12);
        assert_eq!(h.evaluate(11).overflow_count, 1);
        assert_eq!(h.evaluate(11).idx_bits, 1);
        assert_eq!(h.evaluate(12).cost, 7 * 13);
        assert_eq!(h.best(), h.evaluate(3));
    }

    #[test]
    fn best_matches_exhaustive_scan() {
        let data: Vec<u64> = (0..500u64)
            .map(|i| if i % 17 == 0 { 1 << (i % 40) } else { i % 9 })
            .collect();
        let h = LengthHistogram::new(&data);
        let mut expect = h.evaluate(1);
        for k in 2..=h.max_len() {
            let c = h.evaluate(k);
            if c.cost < expect.cost {
                expect = c;
            }
        }
        assert_eq!(h.best(), expect);
    }

    #[test]
    fn ties_keep_smallest_kprime() {
        // n=2: kprime=1 costs 2*2 + 1*2 = 6, kprime=2 costs 2*3 = 6.
        let h = LengthHistogram::new(&[1, 3]);
        assert_eq!(h.evaluate(1).cost, h.evaluate(2).cost);
        assert_eq!(h.best().kprime, 1);
    }

    #[test]
    fn duplicates_get_their_own_entries() {
        let nums = [1, 5000, 2, 5000, 5000, 3];
        let bp = OverflowPacker::from_values(&nums).unwrap();
        assert_eq!(bp.overflow_len(), 3);
        assert_eq!(bp.to_list(), nums);
    }

    #[test]
    fn no_overflow_needed() {
        let nums = [1, 2, 3, 4, 5, 6];
        let bp = OverflowPacker::from_values(&nums).unwrap();
        assert_eq!(bp.overflow_len(), 0);
        assert!(bp.overflow_words().is_empty());
        assert_eq!(bp.to_list(), nums);
    }

    #[test]
    fn single_overflow_entry_is_addressable() {
        let mut nums = vec![1u64; 40];
        nums[17] = 1 << 40;
        let bp = OverflowPacker::from_values(&nums).unwrap();
        assert_eq!(bp.overflow_len(), 1);
        assert_eq!(bp.idx_bits(), 1);
        assert_eq!(bp.get(17).unwrap(), 1 << 40);
        assert_eq!(bp.to_list(), nums);
    }

    #[test]
    fn all_zeros_and_extremes() {
        let bp = OverflowPacker::from_values(&[0, 0, 0]).unwrap();
        assert_eq!(bp.kprime(), 1);
        assert_eq!(bp.slot_width(), 2);
        assert_eq!(bp.to_list(), vec![0, 0, 0]);

        let nums = [u64::MAX, u64::MAX - 1, 1 << 63];
        let bp = OverflowPacker::from_values(&nums).unwrap();
        assert_eq!(bp.to_list(), nums);
        assert!(bp.size_in_bits() <= 3 * 65);
    }

    #[test]
    fn fixed_kprime() {
        let nums = [1, 2, 3, 1024, 4, 5, 2048];
        let bp = OverflowPacker::with_kprime(2, &nums).unwrap();
        assert_eq!(bp.overflow_len(), 4);
        assert_eq!(bp.to_list(), nums);
        assert!(OverflowPacker::with_kprime(0, &nums).is_err());
        assert!(OverflowPacker::with_kprime(65, &nums).is_err());
    }

    #[test]
    fn empty_list() {
        let bp = OverflowPacker::from_values(&[]).unwrap();
        assert!(bp.is_empty());
        assert!(bp.to_list().is_empty());
        assert!(matches!(
            bp.get(0),
            Err(Error::IndexOutOfBounds { index: 0, len: 0 })
        ));
        let bytes = bp.to_bytes().unwrap();
        assert_eq!(bytes, b"BPO1\x01\0\0\0\0");
        assert_eq!(OverflowPacker::from_bytes(&bytes).unwrap(), bp);
    }

    #[test]
    fn negative_not_supported() {
        assert!(matches!(
            OverflowPacker::from_list(&[4, 9, -3]),
            Err(Error::NegativeValue { index: 2, value: -3 })
        ));
    }

    #[test]
    fn bytes_roundtrip_and_header() {
        let nums = [1, 2, 3, 1024, 4, 5, 2048];
        let bp = OverflowPacker::from_values(&nums).unwrap();
        let bytes = bp.to_bytes().unwrap();
        assert_eq!(&bytes[..4], b"BPO1");
        assert_eq!(bytes[4], 1);
        assert_eq!(&bytes[5..9], &7u32.to_le_bytes());
        assert_eq!(&bytes[9..13], &[3, 1, 4, 12]);
        assert_eq!(&bytes[13..17], &1u32.to_le_bytes());
        assert_eq!(&bytes[17..21], &1u32.to_le_bytes());
        assert_eq!(bytes.len(), format::OVERFLOW_HEADER_LEN + 8);

        let bp2 = OverflowPacker::from_bytes(&bytes).unwrap();
        assert_eq!(bp2, bp);
        assert_eq!(bp2.to_list(), nums);
    }

    #[test]
    fn rejects_corrupted_blobs() {
        let bp = OverflowPacker::from_values(&[1, 2, 3, 1024, 4, 5, 2048]).unwrap();
        let bytes = bp.to_bytes().unwrap();

        let mut bad = bytes.clone();
        bad[4] = 2;
        assert!(matches!(
            OverflowPacker::from_bytes(&bad),
            Err(Error::UnsupportedVersion(2))
        ));

        let mut bad = bytes.clone();
        bad[0] = b'Z';
        assert!(matches!(
            OverflowPacker::from_bytes(&bad),
            Err(Error::BadMagic(_))
        ));

        assert!(matches!(
            OverflowPacker::from_bytes(&bytes[..bytes.len() - 2]),
            Err(Error::Truncated { .. })
        ));

        // slot_w inconsistent with kprime/idx_bits.
        let mut bad = bytes.clone();
        bad[11] = 9;
        assert!(matches!(
            OverflowPacker::from_bytes(&bad),
            Err(Error::InvalidEncoding(_))
        ));

        // Clear the flag of slot 3 (bit 15 of word 0): overflow area no longer matches.
        let mut bad = bytes.clone();
        bad[format::OVERFLOW_HEADER_LEN + 1] &= !0x80;
        assert!(OverflowPacker::from_bytes(&bad).is_err());
    }

    #[test]
    fn flag_without_overflow_area_is_structural_error() {
        let bp = OverflowPacker {
            kprime: 3,
            idx_bits: 0,
            slot_w: 4,
            k_over: 0,
            n: 1,
            m: 0,
            words: vec![0b1000],
            overflow_words: vec![],
        };
        assert!(matches!(bp.get(0), Err(Error::MissingOverflowArea)));

        let bp = OverflowPacker {
            kprime: 3,
            idx_bits: 1,
            slot_w: 4,
            k_over: 12,
            n: 1,
            m: 1,
            words: vec![0b1001],
            overflow_words: vec![5],
        };
        assert!(matches!(
            bp.get(0),
            Err(Error::OverflowIndexOutOfRange { index: 1, len: 1 })
        ));
        assert!(matches!(
            bp.try_to_list(),
            Err(Error::OverflowIndexOutOfRange { index: 1, len: 1 })
        ));
    }

    #[test]
    #[should_panic(expected = "overflow entry")]
    fn to_list_never_substitutes_zero() {
        let bp = OverflowPacker {
            kprime: 3,
            idx_bits: 0,
            slot_w: 4,
            k_over: 0,
            n: 2,
            m: 0,
            words: vec![0b1000_0001],
            overflow_words: vec![],
        };
        let _ = bp.to_list();
    }

    #[test]
    fn try_to_list_matches_to_list() {
        let bp = OverflowPacker::from_values(&[1, 2, 3, 1024, 4, 5, 2048]).unwrap();
        assert_eq!(bp.try_to_list().unwrap(), bp.to_list());
        assert!(bp.heap_bytes() >= (bp.words().len() + bp.overflow_words().len()) * 4);
    }
}
