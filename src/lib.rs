//! # Bit-Packed Integer Arrays
//!
//! *Fixed-width and two-tier integer compression with O(1) random access.*
//!
//! ## Intuition First
//!
//! A list of small numbers stored as 32-bit integers is mostly zeros. If the largest
//! value fits in 12 bits, every element can live in a 12-bit field and the array
//! shrinks by almost two thirds. Because every field has the same width, element `i`
//! is still found by arithmetic alone: no decompression, no scanning.
//!
//! ## The Problem
//!
//! Fixed-width packing is hostage to the largest value. One outlier of 2^40 in a
//! million values below 16 forces 41 bits on every element. This crate offers three
//! layouts over 32-bit words:
//!
//! - **Crossing** ([`CrossingPacker`]): `k` bits per element, back to back. Smallest
//!   fixed-width layout; fields may straddle two words.
//! - **Non-crossing** ([`NonCrossingPacker`]): `k` bits per element, but a field never
//!   straddles a word; padding is inserted instead. Each read touches one word.
//! - **Overflow** ([`OverflowPacker`]): narrow flagged slots, with outliers moved to a
//!   side table. The slot width is chosen by an exact search that minimizes the
//!   total encoded size.
//!
//! ## Mathematical Formulation
//!
//! For $n$ values with maximum $u$, let $K = \lceil \lg(u + 1) \rceil$.
//!
//! - Crossing: $nK$ bits.
//! - Non-crossing: $\lfloor 32/K \rfloor$ fields per word for $K \leq 32$, so at most
//!   $32 \lceil n / \lfloor 32/K \rfloor \rceil$ bits.
//! - Overflow: $\min_{k'} \; n(1 + \max(k', \lceil \lg c \rceil)) + cK$ bits, where
//!   $c$ counts values $\geq 2^{k'}$.
//!
//! ## Complexity Analysis
//!
//! - **Build**: $O(n)$ for every layout; the overflow width search is $O(n + K)$.
//! - **Access**: $O(1)$ for every layout.
//!
//! ## What Could Go Wrong
//!
//! 1. **Negative input**: only non-negative integers are supported; signed input is
//!    rejected rather than reinterpreted.
//! 2. **Whole-array knowledge**: widths depend on the full input, so there is no
//!    incremental append.
//! 3. **Corrupt blobs**: every loader validates magic, version and section lengths
//!    before interpreting a single word.
//!
//! ## Example
//!
//! ```
//! # fn main() -> Result<(), bitpack::Error> {
//! use bitpack::{CrossingPacker, OverflowPacker};
//!
//! let crossing = CrossingPacker::from_list(&[1, 5, 8, 15, 31, 255, 1023, 4095])?;
//! assert_eq!(crossing.width(), 12);
//! assert_eq!(crossing.words().len(), 3);
//! assert_eq!(crossing.get(3)?, 15);
//!
//! let overflow = OverflowPacker::from_list(&[1, 2, 3, 1024, 4, 5, 2048])?;
//! assert_eq!(overflow.overflow_len(), 2);
//! assert_eq!(overflow.to_list(), vec![1, 2, 3, 1024, 4, 5, 2048]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bits;
pub mod crossing;
pub mod error;
pub mod format;
pub mod noncrossing;
pub mod overflow;
pub mod packed;
pub mod text;

pub use crossing::CrossingPacker;
pub use error::{Error, Result};
pub use format::Mode;
pub use noncrossing::NonCrossingPacker;
pub use overflow::OverflowPacker;
pub use packed::Packed;
