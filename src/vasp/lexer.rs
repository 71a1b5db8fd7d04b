//! Fast textual-token to integer/float/boolean conversion
//!
//! The text blocks of a vasprun.xml file contain millions of repeated
//! whitespace-separated numeric tokens, so conversion cost dominates the
//! whole parse. Every routine here makes a single linear pass over the
//! token bytes with no intermediate allocation: integers are decoded by
//! hand, floats go through `fast_float` (the same grammar as standard
//! decimal floating-point literals, no locale handling).

use crate::value::{Scalar, ValueType};

use super::error::ParseError;

/// Parse an integer token: optional leading sign, then digits.
///
/// Any other character, an empty digit run, or overflow is a
/// [`ParseError::NumericFormat`].
pub fn parse_int(token: &str) -> Result<i64, ParseError> {
    let bytes = token.as_bytes();
    let (negative, digits) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(b'+') => (false, &bytes[1..]),
        _ => (false, bytes),
    };
    if digits.is_empty() {
        return Err(ParseError::bad_token(token));
    }
    let mut value: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return Err(ParseError::bad_token(token));
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(i64::from(b - b'0')))
            .ok_or_else(|| ParseError::bad_token(token))?;
    }
    Ok(if negative { -value } else { value })
}

/// Parse a float token with standard decimal literal grammar.
///
/// Optional sign, optional integer part, optional fraction, optional
/// `e`/`E` exponent. The whole token must be consumed.
pub fn parse_float(token: &str) -> Result<f64, ParseError> {
    fast_float::parse(token).map_err(|_| ParseError::bad_token(token))
}

/// Parse a logical token: trimmed `"T"` is true, anything else is false.
///
/// There is no explicit false token in the schema; producers emit
/// arbitrary non-`T` strings that downstream consumers have always
/// treated as false, so this stays permissive rather than validating
/// against `"F"`.
pub fn parse_logical(token: &str) -> bool {
    token.trim() == "T"
}

/// Convert one raw token according to a declared value type.
///
/// Numeric tokens are trimmed before lexing (the source pads columns with
/// spaces); string values trim whitespace and map a missing body to the
/// empty string.
pub fn convert_token(typ: ValueType, raw: &str) -> Result<Scalar, ParseError> {
    match typ {
        ValueType::Int => parse_int(raw.trim()).map(Scalar::Int),
        ValueType::Float => parse_float(raw.trim()).map(Scalar::Float),
        ValueType::Str => Ok(Scalar::Str(raw.trim().to_string())),
        ValueType::Logical => Ok(Scalar::Bool(parse_logical(raw))),
    }
}
