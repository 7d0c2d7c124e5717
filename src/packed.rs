//! A single handle over the three packing strategies.

use crate::crossing::CrossingPacker;
use crate::error::{Error, Result};
use crate::format::{self, Mode};
use crate::noncrossing::NonCrossingPacker;
use crate::overflow::OverflowPacker;

/// A packed integer array in any of the supported layouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packed {
    /// Contiguous fixed-width layout.
    Crossing(CrossingPacker),
    /// Word-aligned fixed-width layout.
    NonCrossing(NonCrossingPacker),
    /// Slot plus overflow-area layout.
    Overflow(OverflowPacker),
}

macro_rules! each {
    ($self:expr, $p:ident => $body:expr) => {
        match $self {
            Packed::Crossing($p) => $body,
            Packed::NonCrossing($p) => $body,
            Packed::Overflow($p) => $body,
        }
    };
}

impl Packed {
    /// Pack `values` with the given strategy.
    pub fn from_values(mode: Mode, values: &[u64]) -> Result<Self> {
        Ok(match mode {
            Mode::Crossing => Packed::Crossing(CrossingPacker::from_values(values)?),
            Mode::NonCrossing => Packed::NonCrossing(NonCrossingPacker::from_values(values)?),
            Mode::Overflow => Packed::Overflow(OverflowPacker::from_values(values)?),
        })
    }

    /// Pack signed input with the given strategy, rejecting negative values.
    pub fn from_list(mode: Mode, values: &[i64]) -> Result<Self> {
        Ok(match mode {
            Mode::Crossing => Packed::Crossing(CrossingPacker::from_list(values)?),
            Mode::NonCrossing => Packed::NonCrossing(NonCrossingPacker::from_list(values)?),
            Mode::Overflow => Packed::Overflow(OverflowPacker::from_list(values)?),
        })
    }

    /// The strategy of this array.
    pub fn mode(&self) -> Mode {
        match self {
            Packed::Crossing(_) => Mode::Crossing,
            Packed::NonCrossing(_) => Mode::NonCrossing,
            Packed::Overflow(_) => Mode::Overflow,
        }
    }

    /// Return the number of elements.
    pub fn len(&self) -> usize {
        each!(self, p => p.len())
    }

    /// Return true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the value at index `i`.
    pub fn get(&self, i: usize) -> Result<u64> {
        each!(self, p => p.get(i))
    }

    /// Decode every value.
    pub fn to_list(&self) -> Vec<u64> {
        each!(self, p => p.to_list())
    }

    /// Encoded payload bits.
    pub fn size_in_bits(&self) -> usize {
        each!(self, p => p.size_in_bits())
    }

    /// Serialize in the format matching the strategy.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        each!(self, p => p.to_bytes())
    }

    /// Deserialize any supported blob, detecting the format from its magic marker.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let magic = bytes.get(..4).ok_or(Error::Truncated {
            expected: 4,
            actual: bytes.len(),
        })?;
        if magic == format::MAGIC {
            let saved = format::decode(bytes)?;
            return Ok(match saved.mode {
                Mode::NonCrossing => Packed::NonCrossing(NonCrossingPacker::from_parts(
                    saved.k,
                    saved.n,
                    saved.words,
                )?),
                _ => Packed::Crossing(CrossingPacker::from_parts(saved.k, saved.n, saved.words)?),
            });
        }
        if magic == format::OVERFLOW_MAGIC {
            return Ok(Packed::Overflow(OverflowPacker::from_bytes(bytes)?));
        }
        Err(Error::BadMagic(magic.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: [u64; 7] = [1, 2, 3, 1024, 4, 5, 2048];

    #[test]
    fn every_mode_roundtrips_through_bytes() {
        for mode in Mode::ALL {
            let p = Packed::from_values(mode, &DATA).unwrap();
            assert_eq!(p.mode(), mode);
            assert_eq!(p.len(), DATA.len());
            assert_eq!(p.to_list(), DATA);

            let q = Packed::from_bytes(&p.to_bytes().unwrap()).unwrap();
            assert_eq!(q, p);
            assert_eq!(q.get(6).unwrap(), 2048);
        }
    }

    #[test]
    fn overflow_is_smallest_for_skewed_data() {
        let sizes: Vec<usize> = Mode::ALL
            .iter()
            .map(|&m| Packed::from_values(m, &DATA).unwrap().size_in_bits())
            .collect();
        assert_eq!(sizes, vec![7 * 12, 108, 52]);
    }

    #[test]
    fn rejects_negative_in_every_mode() {
        for mode in Mode::ALL {
            assert!(matches!(
                Packed::from_list(mode, &[0, -7]),
                Err(Error::NegativeValue { index: 1, value: -7 })
            ));
        }
    }

    #[test]
    fn unknown_or_short_blobs() {
        assert!(matches!(
            Packed::from_bytes(b"BP"),
            Err(Error::Truncated {
                expected: 4,
                actual: 2
            })
        ));
        assert!(matches!(
            Packed::from_bytes(b"NOPE0000"),
            Err(Error::BadMagic(_))
        ));
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let p = Packed::from_values(Mode::Overflow, &DATA).unwrap();
        format::save_packed(&path, &p).unwrap();
        assert_eq!(format::load_packed(&path).unwrap(), p);
    }
}
