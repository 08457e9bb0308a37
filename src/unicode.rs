//! JSON `\u` escape decoding and UTF-8 encoding.
//!
//! Handles the full `\uXXXX` grammar including UTF-16 surrogate pairs: a
//! high surrogate must be immediately followed by a `\u` escape carrying a
//! low surrogate, and the two combine into a single codepoint above U+FFFF.
//! All functions are pure and require no synchronization.

/// Maximum valid Unicode codepoint.
pub const UNICODE_MAX: u32 = 0x10_FFFF;
/// High surrogate range (first UTF-16 code unit of a pair).
pub const SURROGATE_HIGH: core::ops::RangeInclusive<u32> = 0xD800..=0xDBFF;
/// Low surrogate range (second UTF-16 code unit of a pair).
pub const SURROGATE_LOW: core::ops::RangeInclusive<u32> = 0xDC00..=0xDFFF;

/// Why a `\u` escape failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeError {
    /// Fewer than 4 hex digits remained in the input.
    Truncated,
    /// One of the 4 digits was not `[0-9a-fA-F]`.
    BadHexDigit,
    /// High surrogate not immediately followed by a `\u` low surrogate.
    UnpairedHighSurrogate,
    /// Low surrogate with no preceding high surrogate.
    UnpairedLowSurrogate,
}

impl EscapeError {
    pub fn reason(self) -> &'static str {
        match self {
            EscapeError::Truncated => "incomplete unicode escape (need 4 hex digits)",
            EscapeError::BadHexDigit => "invalid hex digit in unicode escape",
            EscapeError::UnpairedHighSurrogate => "high surrogate not followed by low surrogate",
            EscapeError::UnpairedLowSurrogate => "lone low surrogate",
        }
    }
}

pub fn is_high_surrogate(cp: u32) -> bool {
    SURROGATE_HIGH.contains(&cp)
}

pub fn is_low_surrogate(cp: u32) -> bool {
    SURROGATE_LOW.contains(&cp)
}

fn is_surrogate(cp: u32) -> bool {
    (0xD800..=0xDFFF).contains(&cp)
}

/// Combine a surrogate pair into a supplementary-plane codepoint.
///
/// Both units must already be validated as high/low surrogates.
pub fn combine_surrogates(high: u32, low: u32) -> u32 {
    0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
}

fn hex_digit(b: u8) -> Option<u32> {
    match b {
        b'0'..=b'9' => Some((b - b'0') as u32),
        b'a'..=b'f' => Some((b - b'a' + 10) as u32),
        b'A'..=b'F' => Some((b - b'A' + 10) as u32),
        _ => None,
    }
}

fn hex4(buf: &[u8], pos: usize) -> Result<u32, EscapeError> {
    if pos + 4 > buf.len() {
        return Err(EscapeError::Truncated);
    }
    let mut value = 0u32;
    for &b in &buf[pos..pos + 4] {
        value = (value << 4) | hex_digit(b).ok_or(EscapeError::BadHexDigit)?;
    }
    Ok(value)
}

/// Decode a `\u` escape starting at `pos`, the position of the first hex
/// digit (just past `\u`).
///
/// Returns the decoded codepoint and the number of input bytes consumed: 4
/// for a BMP escape, 10 for a surrogate pair (`XXXX\uYYYY`). A high
/// surrogate without an immediately following valid low surrogate, or an
/// unpaired low surrogate, is an error.
pub fn decode_escape(buf: &[u8], pos: usize) -> Result<(u32, usize), EscapeError> {
    let first = hex4(buf, pos)?;

    if is_high_surrogate(first) {
        if pos + 10 > buf.len() || buf[pos + 4] != b'\\' || buf[pos + 5] != b'u' {
            return Err(EscapeError::UnpairedHighSurrogate);
        }
        let second = hex4(buf, pos + 6)?;
        if !is_low_surrogate(second) {
            return Err(EscapeError::UnpairedHighSurrogate);
        }
        return Ok((combine_surrogates(first, second), 10));
    }

    if is_low_surrogate(first) {
        return Err(EscapeError::UnpairedLowSurrogate);
    }

    Ok((first, 4))
}

/// Append the UTF-8 encoding of `cp` to `out`.
///
/// Returns `false` (appending nothing) for surrogate codepoints or values
/// above U+10FFFF.
pub fn encode_utf8(cp: u32, out: &mut Vec<u8>) -> bool {
    if cp > UNICODE_MAX || is_surrogate(cp) {
        return false;
    }
    if cp <= 0x7F {
        out.push(cp as u8);
    } else if cp <= 0x7FF {
        out.push(0xC0 | (cp >> 6) as u8);
        out.push(0x80 | (cp & 0x3F) as u8);
    } else if cp <= 0xFFFF {
        out.push(0xE0 | (cp >> 12) as u8);
        out.push(0x80 | ((cp >> 6) & 0x3F) as u8);
        out.push(0x80 | (cp & 0x3F) as u8);
    } else {
        out.push(0xF0 | (cp >> 18) as u8);
        out.push(0x80 | ((cp >> 12) & 0x3F) as u8);
        out.push(0x80 | ((cp >> 6) & 0x3F) as u8);
        out.push(0x80 | (cp & 0x3F) as u8);
    }
    true
}
