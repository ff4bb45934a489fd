//! Numeric literal decoding

use super::error::{QlError, QlResult};

/// Decode an exact numeric literal.
///
/// Accepts an optional leading `-`, an optional `L`/`l` suffix, decimal,
/// hexadecimal (`0x`) and octal (leading `0`) digits. Hex and octal literals
/// spell out the two's complement bit pattern, so `0xffffffffffffffff` is
/// `-1` and `01000000000000000000000` is `i64::MIN`.
pub fn decode_exact(literal: &str) -> QlResult<i64> {
    let (negative, body) = match literal.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, literal),
    };
    let body = body
        .strip_suffix('L')
        .or_else(|| body.strip_suffix('l'))
        .unwrap_or(body);
    if body.is_empty() {
        return Err(QlError::literal(literal, "no digits"));
    }

    let hex = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X"));
    let value = if let Some(digits) = hex {
        decode_bit_pattern(literal, digits, 16, 16)?
    } else if body.len() > 1 && body.starts_with('0') {
        decode_bit_pattern(literal, &body[1..], 8, 22)?
    } else {
        let signed = if negative {
            format!("-{body}")
        } else {
            body.to_string()
        };
        return signed
            .parse::<i64>()
            .map_err(|e| QlError::literal(literal, e.to_string()));
    };

    Ok(if negative { value.wrapping_neg() } else { value })
}

/// Parse `digits` in `radix`. A literal of exactly `width` digits whose top
/// bit is set is decoded by clearing that bit, parsing the rest and adding
/// `i64::MIN`.
fn decode_bit_pattern(literal: &str, digits: &str, radix: u32, width: usize) -> QlResult<i64> {
    if digits.is_empty() {
        return Err(QlError::literal(literal, "no digits"));
    }
    let parse = |text: &str| {
        i64::from_str_radix(text, radix).map_err(|e| QlError::literal(literal, e.to_string()))
    };

    let mut chars = digits.chars();
    let first = chars
        .next()
        .and_then(|c| c.to_digit(radix))
        .ok_or_else(|| QlError::literal(literal, "invalid digit"))?;

    // Top digit of a full-width literal carries the sign bit: 8..=f for hex
    // and 1 for octal (22 octal digits hold 66 bits, the top one is bit 63)
    let sign_threshold = if radix == 16 { 8 } else { 1 };
    if digits.len() == width && first >= sign_threshold {
        if radix == 8 && first > 1 {
            return Err(QlError::literal(literal, "number too large to fit in target type"));
        }
        let rest_first = first - sign_threshold;
        let rest = format!(
            "{}{}",
            char::from_digit(rest_first, radix).unwrap_or('0'),
            chars.as_str()
        );
        return Ok(parse(&rest)?.wrapping_add(i64::MIN));
    }
    parse(digits)
}

/// Decode an approximate numeric literal, accepting `d`/`D`/`f`/`F`
/// suffixes
pub fn decode_approximate(literal: &str) -> QlResult<f64> {
    let body = literal
        .strip_suffix(['d', 'D', 'f', 'F'])
        .unwrap_or(literal);
    body.parse::<f64>()
        .map_err(|e| QlError::literal(literal, e.to_string()))
}

/// Literal text without a type suffix, as SQL expects it
#[must_use]
pub fn strip_type_suffix(literal: &str) -> &str {
    literal
        .strip_suffix(['d', 'D', 'f', 'F', 'l', 'L'])
        .unwrap_or(literal)
}
