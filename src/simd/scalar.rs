//! Scalar reference implementations of the scanning primitives.
//!
//! These define the canonical output every vector backend must reproduce
//! byte for byte. They are also the unconditional fallback when SIMD is
//! disabled or the architecture has no vector backend compiled in.

use super::{Structural, StructuralClass};

#[inline]
pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

#[inline]
fn is_number_char(b: u8) -> bool {
    matches!(b, b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E')
}

pub(crate) fn skip_whitespace(buf: &[u8], mut pos: usize) -> usize {
    while pos < buf.len() && is_whitespace(buf[pos]) {
        pos += 1;
    }
    pos
}

pub(crate) fn scan_string_end(buf: &[u8], mut pos: usize) -> usize {
    while pos < buf.len() {
        let b = buf[pos];
        if b == b'"' || b == b'\\' || b < 0x20 {
            return pos;
        }
        pos += 1;
    }
    pos
}

pub(crate) fn validate_number_chars(buf: &[u8], start: usize, end: usize) -> bool {
    buf[start..end].iter().all(|&b| is_number_char(b))
}

pub(crate) fn match_literal(buf: &[u8], pos: usize, literal: &[u8]) -> bool {
    pos + literal.len() <= buf.len() && &buf[pos..pos + literal.len()] == literal
}

/// Validate UTF-8 over `start..end`. A multi-byte sequence that runs past
/// `end` is invalid: the range is expected to cover a complete string.
pub(crate) fn validate_utf8(buf: &[u8], start: usize, end: usize) -> bool {
    let mut pos = start;
    while pos < end {
        let b = buf[pos];
        if b < 0x80 {
            pos += 1;
        } else if (b & 0xE0) == 0xC0 {
            // 2-byte sequence; C0/C1 would be overlong.
            if b < 0xC2 || pos + 1 >= end || !is_continuation(buf[pos + 1]) {
                return false;
            }
            pos += 2;
        } else if (b & 0xF0) == 0xE0 {
            if pos + 2 >= end || !is_continuation(buf[pos + 1]) || !is_continuation(buf[pos + 2]) {
                return false;
            }
            let b2 = buf[pos + 1];
            if b == 0xE0 && b2 < 0xA0 {
                return false; // overlong
            }
            if b == 0xED && b2 >= 0xA0 {
                return false; // surrogate range
            }
            pos += 3;
        } else if (b & 0xF8) == 0xF0 {
            if b > 0xF4
                || pos + 3 >= end
                || !is_continuation(buf[pos + 1])
                || !is_continuation(buf[pos + 2])
                || !is_continuation(buf[pos + 3])
            {
                return false;
            }
            let b2 = buf[pos + 1];
            if b == 0xF0 && b2 < 0x90 {
                return false; // overlong
            }
            if b == 0xF4 && b2 >= 0x90 {
                return false; // above U+10FFFF
            }
            pos += 4;
        } else {
            return false;
        }
    }
    true
}

#[inline]
fn is_continuation(b: u8) -> bool {
    (b & 0xC0) == 0x80
}

pub(crate) fn find_structural_chars(
    buf: &[u8],
    start: usize,
    end: usize,
    out: &mut Vec<Structural>,
) {
    for pos in start..end {
        if let Some(class) = StructuralClass::from_byte(buf[pos]) {
            out.push((pos, class));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_whitespace_stops_at_token() {
        assert_eq!(skip_whitespace(b"  \t\n\rx  ", 0), 5);
        assert_eq!(skip_whitespace(b"x", 0), 0);
        assert_eq!(skip_whitespace(b"   ", 0), 3);
        assert_eq!(skip_whitespace(b"", 0), 0);
    }

    #[test]
    fn scan_string_end_finds_terminators() {
        assert_eq!(scan_string_end(b"abc\"def", 0), 3);
        assert_eq!(scan_string_end(b"abc\\n", 0), 3);
        assert_eq!(scan_string_end(b"ab\x01c", 0), 2);
        assert_eq!(scan_string_end(b"abc", 0), 3);
        // High bytes are not terminators.
        assert_eq!(scan_string_end("héllo\"".as_bytes(), 0), 6);
    }

    #[test]
    fn number_chars() {
        assert!(validate_number_chars(b"-1.5e+10", 0, 8));
        assert!(!validate_number_chars(b"12x3", 0, 4));
        assert!(validate_number_chars(b"x123x", 1, 4));
    }

    #[test]
    fn literal_match_respects_bounds() {
        assert!(match_literal(b"true", 0, b"true"));
        assert!(match_literal(b"xnull", 1, b"null"));
        assert!(!match_literal(b"tru", 0, b"true"));
        assert!(!match_literal(b"false", 0, b"true"));
    }

    #[test]
    fn utf8_validation() {
        let s = "héllo 世界 🎉".as_bytes();
        assert!(validate_utf8(s, 0, s.len()));
        // Cutting into the trailing 4-byte sequence must fail.
        assert!(!validate_utf8(s, 0, s.len() - 1));
        assert!(!validate_utf8(b"\x80", 0, 1)); // stray continuation
        assert!(!validate_utf8(b"\xC0\x80", 0, 2)); // overlong
        assert!(!validate_utf8(b"\xED\xA0\x80", 0, 3)); // surrogate
        assert!(!validate_utf8(b"\xF5\x80\x80\x80", 0, 4)); // above max
        assert!(!validate_utf8(b"\xE2\x82", 0, 2)); // truncated
    }

    #[test]
    fn structural_scan_classifies() {
        let mut out = Vec::new();
        find_structural_chars(b"{\"a\": [1,2]}", 0, 12, &mut out);
        let classes: Vec<StructuralClass> = out.iter().map(|&(_, c)| c).collect();
        assert_eq!(
            classes,
            [
                StructuralClass::ObjectOpen,
                StructuralClass::Quote,
                StructuralClass::Quote,
                StructuralClass::Colon,
                StructuralClass::ArrayOpen,
                StructuralClass::Comma,
                StructuralClass::ArrayClose,
                StructuralClass::ObjectClose,
            ]
        );
        assert_eq!(out[0].0, 0);
        assert_eq!(out[7].0, 11);
    }
}
