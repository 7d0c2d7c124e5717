//! Error types for bit-packing operations.

use thiserror::Error;

/// Error variants for packing, access and (de)serialization.
#[derive(Debug, Error)]
pub enum Error {
    /// An input value was negative; only non-negative integers can be packed.
    #[error("negative value {value} at index {index} is not supported")]
    NegativeValue {
        /// Position of the offending value in the input.
        index: usize,
        /// The offending value.
        value: i64,
    },

    /// A value does not fit in the requested number of bits.
    #[error("value {value} does not fit in {width} bits")]
    ValueTooWide {
        /// The value that was being written.
        value: u64,
        /// The field width in bits.
        width: usize,
    },

    /// A field width larger than a `u64` was requested.
    #[error("width {0} exceeds 64 bits")]
    WidthTooLarge(usize),

    /// A zero width was requested for a non-empty array.
    #[error("width must be at least 1 bit for {0} elements")]
    ZeroWidth(usize),

    /// An index was provided that is out of the structure's bounds.
    #[error("index out of bounds: {index} (len {len})")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// Number of stored elements.
        len: usize,
    },

    /// A slot is flagged as overflow but the structure has no overflow area.
    #[error("overflow flag set but no overflow area")]
    MissingOverflowArea,

    /// A slot refers to an overflow entry that does not exist.
    #[error("overflow index {index} out of range (overflow len {len})")]
    OverflowIndexOutOfRange {
        /// The decoded overflow index.
        index: u64,
        /// Number of overflow entries.
        len: usize,
    },

    /// The blob does not start with a known magic marker.
    #[error("bad magic: {0:02x?}")]
    BadMagic(Vec<u8>),

    /// The overflow format version is not supported.
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),

    /// The crossing-family mode tag is unknown.
    #[error("unknown mode code {0}")]
    UnknownMode(u8),

    /// The blob ended before the declared sections.
    #[error("truncated input: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes required by the header.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// A header field does not fit its fixed on-disk width.
    #[error("{field} = {value} does not fit its header field")]
    FieldOverflow {
        /// Name of the header field.
        field: &'static str,
        /// The value that was too large.
        value: u128,
    },

    /// Encoded data is structurally inconsistent.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// A text token is not an integer.
    #[error("invalid integer token {token:?}")]
    InvalidToken {
        /// The token as it appeared in the input.
        token: String,
    },

    /// An unknown packing mode name.
    #[error("unknown mode {0:?}")]
    UnknownModeName(String),

    /// An I/O error occurred during serialization or deserialization.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for bit-packing operations.
pub type Result<T> = std::result::Result<T, Error>;
