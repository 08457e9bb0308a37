//! AArch64 NEON backend, 16 bytes per iteration.
//!
//! NEON has no movemask, so chunks are classified with whole-vector
//! reductions (`vmaxvq_u8`/`vminvq_u8`) and the exact index inside an
//! interesting chunk is recovered by storing the match vector and scanning
//! it as bytes. Output is byte-identical to the scalar implementations in
//! `scalar.rs`.

use core::arch::aarch64::*;

use super::{scalar, Backend, Structural, StructuralClass};

pub(crate) static NEON: Backend = Backend {
    name: "neon",
    skip_whitespace,
    scan_string_end,
    validate_number_chars,
    match_literal,
    validate_utf8,
    find_structural_chars,
};

fn skip_whitespace(buf: &[u8], pos: usize) -> usize {
    // SAFETY: NEON is mandatory on aarch64.
    unsafe { skip_whitespace_impl(buf, pos) }
}

#[target_feature(enable = "neon")]
unsafe fn skip_whitespace_impl(buf: &[u8], mut pos: usize) -> usize {
    while pos + 16 <= buf.len() {
        let chunk = vld1q_u8(buf.as_ptr().add(pos));
        let ws = vorrq_u8(
            vorrq_u8(
                vceqq_u8(chunk, vdupq_n_u8(b' ')),
                vceqq_u8(chunk, vdupq_n_u8(b'\t')),
            ),
            vorrq_u8(
                vceqq_u8(chunk, vdupq_n_u8(b'\n')),
                vceqq_u8(chunk, vdupq_n_u8(b'\r')),
            ),
        );
        // All lanes 0xFF means the whole chunk is whitespace.
        if vminvq_u8(ws) != 0xFF {
            let mut lanes = [0u8; 16];
            vst1q_u8(lanes.as_mut_ptr(), ws);
            for (i, &lane) in lanes.iter().enumerate() {
                if lane == 0 {
                    return pos + i;
                }
            }
        }
        pos += 16;
    }
    scalar::skip_whitespace(buf, pos)
}

fn scan_string_end(buf: &[u8], pos: usize) -> usize {
    // SAFETY: NEON is mandatory on aarch64.
    unsafe { scan_string_end_impl(buf, pos) }
}

#[target_feature(enable = "neon")]
unsafe fn scan_string_end_impl(buf: &[u8], mut pos: usize) -> usize {
    while pos + 16 <= buf.len() {
        let chunk = vld1q_u8(buf.as_ptr().add(pos));
        let special = vorrq_u8(
            vorrq_u8(
                vceqq_u8(chunk, vdupq_n_u8(b'"')),
                vceqq_u8(chunk, vdupq_n_u8(b'\\')),
            ),
            // Unsigned compare, so high bytes are not flagged as control.
            vcltq_u8(chunk, vdupq_n_u8(0x20)),
        );
        if vmaxvq_u8(special) != 0 {
            let mut lanes = [0u8; 16];
            vst1q_u8(lanes.as_mut_ptr(), special);
            for (i, &lane) in lanes.iter().enumerate() {
                if lane != 0 {
                    return pos + i;
                }
            }
        }
        pos += 16;
    }
    scalar::scan_string_end(buf, pos)
}

fn validate_number_chars(buf: &[u8], start: usize, end: usize) -> bool {
    // SAFETY: NEON is mandatory on aarch64.
    unsafe { validate_number_chars_impl(buf, start, end) }
}

#[target_feature(enable = "neon")]
unsafe fn validate_number_chars_impl(buf: &[u8], start: usize, end: usize) -> bool {
    let mut pos = start;
    while pos + 16 <= end {
        let chunk = vld1q_u8(buf.as_ptr().add(pos));
        let digit = vandq_u8(
            vcgeq_u8(chunk, vdupq_n_u8(b'0')),
            vcleq_u8(chunk, vdupq_n_u8(b'9')),
        );
        let marks = vorrq_u8(
            vorrq_u8(
                vceqq_u8(chunk, vdupq_n_u8(b'-')),
                vceqq_u8(chunk, vdupq_n_u8(b'+')),
            ),
            vorrq_u8(
                vceqq_u8(chunk, vdupq_n_u8(b'.')),
                vorrq_u8(
                    vceqq_u8(chunk, vdupq_n_u8(b'e')),
                    vceqq_u8(chunk, vdupq_n_u8(b'E')),
                ),
            ),
        );
        if vminvq_u8(vorrq_u8(digit, marks)) != 0xFF {
            return false;
        }
        pos += 16;
    }
    scalar::validate_number_chars(buf, pos, end)
}

fn match_literal(buf: &[u8], pos: usize, literal: &[u8]) -> bool {
    if literal.len() > 16 || pos + 16 > buf.len() {
        return scalar::match_literal(buf, pos, literal);
    }
    // SAFETY: NEON is mandatory on aarch64; bounds checked above.
    unsafe { match_literal_impl(buf, pos, literal) }
}

#[target_feature(enable = "neon")]
unsafe fn match_literal_impl(buf: &[u8], pos: usize, literal: &[u8]) -> bool {
    let mut padded = [0u8; 16];
    padded[..literal.len()].copy_from_slice(literal);
    let chunk = vld1q_u8(buf.as_ptr().add(pos));
    let expected = vld1q_u8(padded.as_ptr());
    let eq = vceqq_u8(chunk, expected);
    let mut lanes = [0u8; 16];
    vst1q_u8(lanes.as_mut_ptr(), eq);
    lanes[..literal.len()].iter().all(|&lane| lane == 0xFF)
}

fn validate_utf8(buf: &[u8], start: usize, end: usize) -> bool {
    // SAFETY: NEON is mandatory on aarch64.
    unsafe { validate_utf8_impl(buf, start, end) }
}

#[target_feature(enable = "neon")]
unsafe fn validate_utf8_impl(buf: &[u8], start: usize, end: usize) -> bool {
    let mut pos = start;
    while pos + 16 <= end {
        let chunk = vld1q_u8(buf.as_ptr().add(pos));
        // First chunk with a high bit hands the rest to the scalar DFA.
        if vmaxvq_u8(chunk) >= 0x80 {
            return scalar::validate_utf8(buf, pos, end);
        }
        pos += 16;
    }
    scalar::validate_utf8(buf, pos, end)
}

fn find_structural_chars(buf: &[u8], start: usize, end: usize, out: &mut Vec<Structural>) {
    // SAFETY: NEON is mandatory on aarch64.
    unsafe { find_structural_chars_impl(buf, start, end, out) }
}

#[target_feature(enable = "neon")]
unsafe fn find_structural_chars_impl(
    buf: &[u8],
    start: usize,
    end: usize,
    out: &mut Vec<Structural>,
) {
    let mut pos = start;
    while pos + 16 <= end {
        let chunk = vld1q_u8(buf.as_ptr().add(pos));
        let mut structural = vceqq_u8(chunk, vdupq_n_u8(b'{'));
        for b in [b'}', b'[', b']', b':', b',', b'"', b'\\'] {
            structural = vorrq_u8(structural, vceqq_u8(chunk, vdupq_n_u8(b)));
        }
        if vmaxvq_u8(structural) != 0 {
            let mut lanes = [0u8; 16];
            vst1q_u8(lanes.as_mut_ptr(), structural);
            for (i, &lane) in lanes.iter().enumerate() {
                if lane != 0 {
                    let at = pos + i;
                    if let Some(class) = StructuralClass::from_byte(buf[at]) {
                        out.push((at, class));
                    }
                }
            }
        }
        pos += 16;
    }
    scalar::find_structural_chars(buf, pos, end, out);
}
