//! Binary persistence of packed arrays.
//!
//! All fields are little-endian and fixed-width.
//!
//! Crossing family (crossing and non-crossing layouts):
//!
//! ```text
//! magic "BPK1" (4) | mode u8 (0 = crossing, 1 = non-crossing) | k u16 | n u32
//! | word_count u32 | word_count x u32 words
//! ```
//!
//! Overflow layout (see [`crate::overflow`]):
//!
//! ```text
//! magic "BPO1" (4) | version u8 | n u32 | kprime u8 | idx_bits u8 | slot_w u8
//! | k_over u8 | main_word_count u32 | overflow_word_count u32
//! | main words | overflow words
//! ```
//!
//! An empty overflow array is written as just `magic | version | n = 0`.
//!
//! Non-crossing start offsets are never written; they are recomputed from `k` and
//! `n` on load.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::packed::Packed;

/// Magic marker of the crossing-family format.
pub const MAGIC: &[u8; 4] = b"BPK1";

/// Magic marker of the overflow format.
pub const OVERFLOW_MAGIC: &[u8; 4] = b"BPO1";

/// Current overflow format version.
pub const OVERFLOW_VERSION: u8 = 1;

/// Size of the crossing-family header in bytes.
pub const HEADER_LEN: usize = 4 + 1 + 2 + 4 + 4;

/// Size of the full overflow header in bytes.
pub const OVERFLOW_HEADER_LEN: usize = 4 + 1 + 4 + 4 + 4 + 4;

/// Size of the header written for an empty overflow array.
pub const OVERFLOW_EMPTY_LEN: usize = 4 + 1 + 4;

const MODE_CROSSING: u8 = 0;
const MODE_NONCROSSING: u8 = 1;

/// Packing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Contiguous fixed-width fields.
    Crossing,
    /// Fixed-width fields padded so none straddles a word.
    NonCrossing,
    /// Flagged slots with a side table for large values.
    Overflow,
}

impl Mode {
    /// All modes, in display order.
    pub const ALL: [Mode; 3] = [Mode::Crossing, Mode::NonCrossing, Mode::Overflow];

    /// Canonical text name.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Crossing => "crossing",
            Mode::NonCrossing => "non-crossing",
            Mode::Overflow => "overflow",
        }
    }

    fn code(self) -> Result<u8> {
        match self {
            Mode::Crossing => Ok(MODE_CROSSING),
            Mode::NonCrossing => Ok(MODE_NONCROSSING),
            Mode::Overflow => Err(Error::InvalidEncoding(
                "overflow arrays use their own format".to_string(),
            )),
        }
    }

    fn from_code(code: u8) -> Result<Self> {
        match code {
            MODE_CROSSING => Ok(Mode::Crossing),
            MODE_NONCROSSING => Ok(Mode::NonCrossing),
            other => Err(Error::UnknownMode(other)),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "crossing" => Ok(Mode::Crossing),
            "non-crossing" | "non_crossing" | "noncrossing" => Ok(Mode::NonCrossing),
            "overflow" => Ok(Mode::Overflow),
            other => Err(Error::UnknownModeName(other.to_string())),
        }
    }
}

/// Decoded contents of a crossing-family blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Saved {
    /// Layout of the words.
    pub mode: Mode,
    /// Bits per element.
    pub k: usize,
    /// Number of elements.
    pub n: usize,
    /// Packed words.
    pub words: Vec<u32>,
}

/// Narrow a header field, failing if it does not fit.
pub(crate) fn narrow<T: TryFrom<usize>>(field: &'static str, value: usize) -> Result<T> {
    T::try_from(value).map_err(|_| Error::FieldOverflow {
        field,
        value: value as u128,
    })
}

pub(crate) fn put_words(out: &mut Vec<u8>, words: &[u32]) {
    out.reserve(words.len() * 4);
    for &w in words {
        out.extend_from_slice(&w.to_le_bytes());
    }
}

/// Bounds-checked little-endian cursor over a byte slice.
pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    off: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, off: 0 }
    }

    /// Fail with [`Error::Truncated`] unless `n` more bytes are available.
    pub(crate) fn require(&self, n: usize) -> Result<()> {
        let expected = self.off.saturating_add(n);
        if expected > self.bytes.len() {
            return Err(Error::Truncated {
                expected,
                actual: self.bytes.len(),
            });
        }
        Ok(())
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        self.require(n)?;
        let slice = &self.bytes[self.off..self.off + n];
        self.off += n;
        Ok(slice)
    }

    pub(crate) fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub(crate) fn words(&mut self, count: usize) -> Result<Vec<u32>> {
        let raw = self.take(count.saturating_mul(4))?;
        Ok(raw
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Fail if bytes remain after the declared sections.
    pub(crate) fn finish(self, what: &str) -> Result<()> {
        if self.off != self.bytes.len() {
            return Err(Error::InvalidEncoding(format!(
                "{} trailing bytes after {what}",
                self.bytes.len() - self.off
            )));
        }
        Ok(())
    }
}

/// Encode a crossing or non-crossing array.
pub fn encode(mode: Mode, k: usize, n: usize, words: &[u32]) -> Result<Vec<u8>> {
    let code = mode.code()?;
    let k: u16 = narrow("k", k)?;
    let n: u32 = narrow("n", n)?;
    let wlen: u32 = narrow("word_count", words.len())?;

    let mut out = Vec::with_capacity(HEADER_LEN + words.len() * 4);
    out.extend_from_slice(MAGIC);
    out.push(code);
    out.extend_from_slice(&k.to_le_bytes());
    out.extend_from_slice(&n.to_le_bytes());
    out.extend_from_slice(&wlen.to_le_bytes());
    put_words(&mut out, words);
    Ok(out)
}

/// Decode a crossing-family blob.
///
/// The magic, mode and declared lengths are all checked before any word is read.
pub fn decode(bytes: &[u8]) -> Result<Saved> {
    let mut r = ByteReader::new(bytes);
    r.require(HEADER_LEN)?;
    let magic = r.take(4)?;
    if magic != MAGIC {
        return Err(Error::BadMagic(magic.to_vec()));
    }
    let mode = Mode::from_code(r.u8()?)?;
    let k = r.u16()? as usize;
    let n = r.u32()? as usize;
    let wlen = r.u32()? as usize;
    r.require(wlen * 4)?;
    let words = r.words(wlen)?;
    r.finish("packed words")?;
    Ok(Saved { mode, k, n, words })
}

/// Write a crossing or non-crossing array to `path`.
pub fn save(path: impl AsRef<Path>, mode: Mode, k: usize, n: usize, words: &[u32]) -> Result<()> {
    fs::write(path, encode(mode, k, n, words)?)?;
    Ok(())
}

/// Read a crossing-family file written by [`save`].
pub fn load(path: impl AsRef<Path>) -> Result<Saved> {
    decode(&fs::read(path)?)
}

/// Write any packed array to `path`, choosing the format from its mode.
pub fn save_packed(path: impl AsRef<Path>, packed: &Packed) -> Result<()> {
    fs::write(path, packed.to_bytes()?)?;
    Ok(())
}

/// Read any packed array from `path`, detecting the format from its magic.
pub fn load_packed(path: impl AsRef<Path>) -> Result<Packed> {
    Packed::from_bytes(&fs::read(path)?)
}
