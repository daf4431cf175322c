//! Bounded parsers for line-protocol parameter values
//!
//! Every decode path rejects rather than truncates: a value of the wrong
//! length or shape is an error, never a partial read.

use crate::error::{ParseError, Result};
use crate::MAX_DECIMAL_DIGITS;

/// Parse an unsigned decimal protocol value.
///
/// At most [`MAX_DECIMAL_DIGITS`] digits are accepted, which keeps the
/// value comfortably inside `u32` without overflow checks downstream.
pub fn parse_decimal(value: &str) -> Result<u32> {
    if value.is_empty() {
        return Err(ParseError::NotANumber);
    }
    if value.len() > MAX_DECIMAL_DIGITS {
        return Err(ParseError::TooManyDigits(MAX_DECIMAL_DIGITS));
    }

    let mut out: u32 = 0;
    for c in value.bytes() {
        if !c.is_ascii_digit() {
            return Err(ParseError::NotANumber);
        }
        out = out * 10 + u32::from(c - b'0');
    }

    Ok(out)
}

/// Decode a hex parameter that must describe exactly `len` bytes.
pub fn decode_hex_exact(value: &str, len: usize) -> Result<Vec<u8>> {
    if value.len() != 2 * len {
        return Err(ParseError::BadLength {
            expected: 2 * len,
            actual: value.len(),
        });
    }
    hex::decode(value).map_err(|_| ParseError::BadHex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("7"), Ok(7));
        assert_eq!(parse_decimal("1001"), Ok(1001));
        assert_eq!(parse_decimal("9999999"), Ok(9_999_999));
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        assert_eq!(parse_decimal(""), Err(ParseError::NotANumber));
        assert_eq!(parse_decimal("abc"), Err(ParseError::NotANumber));
        assert_eq!(parse_decimal("12a"), Err(ParseError::NotANumber));
        assert_eq!(parse_decimal("-4"), Err(ParseError::NotANumber));
        assert_eq!(
            parse_decimal("12345678"),
            Err(ParseError::TooManyDigits(7))
        );
    }

    #[test]
    fn test_decode_hex_exact() {
        assert_eq!(decode_hex_exact("0102ff", 3).unwrap(), vec![1, 2, 0xff]);

        // Wrong length never partially decodes
        assert_eq!(
            decode_hex_exact("0102", 3),
            Err(ParseError::BadLength {
                expected: 6,
                actual: 4
            })
        );
        assert_eq!(decode_hex_exact("01zz02", 3), Err(ParseError::BadHex));
    }
}
