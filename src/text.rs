//! Plain-text integer arrays.
//!
//! One array per document; tokens are separated by any mix of whitespace, commas
//! and semicolons. A leading UTF-8 byte-order mark is ignored.

use crate::error::{Error, Result};

/// Parse every integer token in `input` as an unsigned value.
///
/// Accepts the full `u64` range, so anything written by [`format_ints`] reads back.
///
/// # Errors
///
/// - [`Error::NegativeValue`] for a negative token, with its position.
/// - [`Error::InvalidToken`] for anything else that is not an integer in range.
pub fn parse_ints(input: &str) -> Result<Vec<u64>> {
    input
        .trim_start_matches('\u{feff}')
        .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .filter(|tok| !tok.is_empty())
        .enumerate()
        .map(|(index, tok)| parse_token(index, tok))
        .collect()
}

fn parse_token(index: usize, tok: &str) -> Result<u64> {
    let invalid = || Error::InvalidToken {
        token: tok.to_string(),
    };
    if tok.starts_with('-') {
        let value = tok.parse::<i64>().map_err(|_| invalid())?;
        if value < 0 {
            return Err(Error::NegativeValue { index, value });
        }
        // "-0"
        return Ok(0);
    }
    tok.parse::<u64>().map_err(|_| invalid())
}

/// Format values as a single space-separated line.
pub fn format_ints(values: &[u64]) -> String {
    let mut out = String::with_capacity(values.len() * 4);
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&v.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_separators() {
        let got = parse_ints("\u{feff}1, 2;3\n  4\t5,,;\r\n6").unwrap();
        assert_eq!(got, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn negatives_and_garbage_fail() {
        assert!(matches!(
            parse_ints("4, -3").unwrap_err(),
            Error::NegativeValue { index: 1, value: -3 }
        ));
        assert_eq!(parse_ints("-0 +7").unwrap(), vec![0, 7]);
        let e = parse_ints("1 two 3").unwrap_err();
        assert!(matches!(e, Error::InvalidToken { token } if token == "two"));
        assert!(matches!(
            parse_ints("18446744073709551616").unwrap_err(),
            Error::InvalidToken { .. }
        ));
    }

    #[test]
    fn full_u64_range_reads_back() {
        let values = [0, 1 << 63, u64::MAX - 1, u64::MAX];
        let line = format_ints(&values);
        assert_eq!(line, "0 9223372036854775808 18446744073709551614 18446744073709551615");
        assert_eq!(parse_ints(&line).unwrap(), values);
    }

    #[test]
    fn empty_input() {
        assert!(parse_ints("").unwrap().is_empty());
        assert!(parse_ints(" ,; \n").unwrap().is_empty());
        assert_eq!(format_ints(&[]), "");
    }

    #[test]
    fn format_one_line() {
        assert_eq!(format_ints(&[1, 1024, 0]), "1 1024 0");
    }
}
