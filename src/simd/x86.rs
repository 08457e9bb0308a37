//! x86_64 vector backends: SSE2 (16 bytes per iteration), AVX2 (32) and
//! AVX-512BW (64).
//!
//! Every function here must produce exactly the output of its scalar
//! counterpart in `scalar.rs`. Remainders shorter than one vector are
//! finished by the scalar code. Unsigned byte comparisons on SSE2/AVX2
//! (which only have signed compares) use the `min_epu8`/`cmpeq` identity so
//! that bytes >= 0x80 classify the same way the scalar code classifies
//! them.
//!
//! The `unsafe` inner functions require their target feature at runtime.
//! They are only reachable through the [`Backend`] tables below, which the
//! selector hands out strictly after `cpu::detect` has confirmed the
//! feature.

use core::arch::x86_64::*;

use super::{scalar, Backend, Structural, StructuralClass};

pub(crate) static SSE2: Backend = Backend {
    name: "sse2",
    skip_whitespace: skip_whitespace_sse2,
    scan_string_end: scan_string_end_sse2,
    validate_number_chars: validate_number_chars_sse2,
    match_literal: match_literal_sse2,
    validate_utf8: validate_utf8_sse2,
    find_structural_chars: find_structural_chars_sse2,
};

pub(crate) static AVX2: Backend = Backend {
    name: "avx2",
    skip_whitespace: skip_whitespace_avx2,
    scan_string_end: scan_string_end_avx2,
    validate_number_chars: validate_number_chars_avx2,
    match_literal: match_literal_sse2,
    validate_utf8: validate_utf8_avx2,
    find_structural_chars: find_structural_chars_avx2,
};

pub(crate) static AVX512: Backend = Backend {
    name: "avx512",
    skip_whitespace: skip_whitespace_avx512,
    scan_string_end: scan_string_end_avx512,
    validate_number_chars: validate_number_chars_avx512,
    match_literal: match_literal_sse2,
    validate_utf8: validate_utf8_avx512,
    find_structural_chars: find_structural_chars_avx512,
};

// ---------------------------------------------------------------------------
// skip_whitespace
// ---------------------------------------------------------------------------

fn skip_whitespace_sse2(buf: &[u8], pos: usize) -> usize {
    // SAFETY: backend selected only after sse2 was detected.
    unsafe { skip_whitespace_sse2_impl(buf, pos) }
}

#[target_feature(enable = "sse2")]
unsafe fn skip_whitespace_sse2_impl(buf: &[u8], mut pos: usize) -> usize {
    while pos + 16 <= buf.len() {
        let chunk = _mm_loadu_si128(buf.as_ptr().add(pos) as *const __m128i);
        let ws = _mm_or_si128(
            _mm_or_si128(
                _mm_cmpeq_epi8(chunk, _mm_set1_epi8(b' ' as i8)),
                _mm_cmpeq_epi8(chunk, _mm_set1_epi8(b'\t' as i8)),
            ),
            _mm_or_si128(
                _mm_cmpeq_epi8(chunk, _mm_set1_epi8(b'\n' as i8)),
                _mm_cmpeq_epi8(chunk, _mm_set1_epi8(b'\r' as i8)),
            ),
        );
        let mask = _mm_movemask_epi8(ws) as u32;
        if mask != 0xFFFF {
            return pos + (!mask & 0xFFFF).trailing_zeros() as usize;
        }
        pos += 16;
    }
    scalar::skip_whitespace(buf, pos)
}

fn skip_whitespace_avx2(buf: &[u8], pos: usize) -> usize {
    // SAFETY: backend selected only after avx2 was detected.
    unsafe { skip_whitespace_avx2_impl(buf, pos) }
}

#[target_feature(enable = "avx2")]
unsafe fn skip_whitespace_avx2_impl(buf: &[u8], mut pos: usize) -> usize {
    while pos + 32 <= buf.len() {
        let chunk = _mm256_loadu_si256(buf.as_ptr().add(pos) as *const __m256i);
        let ws = _mm256_or_si256(
            _mm256_or_si256(
                _mm256_cmpeq_epi8(chunk, _mm256_set1_epi8(b' ' as i8)),
                _mm256_cmpeq_epi8(chunk, _mm256_set1_epi8(b'\t' as i8)),
            ),
            _mm256_or_si256(
                _mm256_cmpeq_epi8(chunk, _mm256_set1_epi8(b'\n' as i8)),
                _mm256_cmpeq_epi8(chunk, _mm256_set1_epi8(b'\r' as i8)),
            ),
        );
        let mask = _mm256_movemask_epi8(ws) as u32;
        if mask != 0xFFFF_FFFF {
            return pos + (!mask).trailing_zeros() as usize;
        }
        pos += 32;
    }
    scalar::skip_whitespace(buf, pos)
}

fn skip_whitespace_avx512(buf: &[u8], pos: usize) -> usize {
    // SAFETY: backend selected only after avx512f+avx512bw were detected.
    unsafe { skip_whitespace_avx512_impl(buf, pos) }
}

#[target_feature(enable = "avx512f,avx512bw")]
unsafe fn skip_whitespace_avx512_impl(buf: &[u8], mut pos: usize) -> usize {
    while pos + 64 <= buf.len() {
        let chunk = _mm512_loadu_epi8(buf.as_ptr().add(pos) as *const i8);
        let ws = _mm512_cmpeq_epi8_mask(chunk, _mm512_set1_epi8(b' ' as i8))
            | _mm512_cmpeq_epi8_mask(chunk, _mm512_set1_epi8(b'\t' as i8))
            | _mm512_cmpeq_epi8_mask(chunk, _mm512_set1_epi8(b'\n' as i8))
            | _mm512_cmpeq_epi8_mask(chunk, _mm512_set1_epi8(b'\r' as i8));
        if ws != u64::MAX {
            return pos + (!ws).trailing_zeros() as usize;
        }
        pos += 64;
    }
    scalar::skip_whitespace(buf, pos)
}

// ---------------------------------------------------------------------------
// scan_string_end
// ---------------------------------------------------------------------------

fn scan_string_end_sse2(buf: &[u8], pos: usize) -> usize {
    // SAFETY: backend selected only after sse2 was detected.
    unsafe { scan_string_end_sse2_impl(buf, pos) }
}

#[target_feature(enable = "sse2")]
unsafe fn scan_string_end_sse2_impl(buf: &[u8], mut pos: usize) -> usize {
    let control_max = _mm_set1_epi8(0x1F);
    while pos + 16 <= buf.len() {
        let chunk = _mm_loadu_si128(buf.as_ptr().add(pos) as *const __m128i);
        let quote = _mm_cmpeq_epi8(chunk, _mm_set1_epi8(b'"' as i8));
        let backslash = _mm_cmpeq_epi8(chunk, _mm_set1_epi8(b'\\' as i8));
        // Unsigned b <= 0x1F: min(b, 0x1F) == b.
        let control = _mm_cmpeq_epi8(_mm_min_epu8(chunk, control_max), chunk);
        let special = _mm_or_si128(_mm_or_si128(quote, backslash), control);
        let mask = _mm_movemask_epi8(special) as u32;
        if mask != 0 {
            return pos + mask.trailing_zeros() as usize;
        }
        pos += 16;
    }
    scalar::scan_string_end(buf, pos)
}

fn scan_string_end_avx2(buf: &[u8], pos: usize) -> usize {
    // SAFETY: backend selected only after avx2 was detected.
    unsafe { scan_string_end_avx2_impl(buf, pos) }
}

#[target_feature(enable = "avx2")]
unsafe fn scan_string_end_avx2_impl(buf: &[u8], mut pos: usize) -> usize {
    let control_max = _mm256_set1_epi8(0x1F);
    while pos + 32 <= buf.len() {
        let chunk = _mm256_loadu_si256(buf.as_ptr().add(pos) as *const __m256i);
        let quote = _mm256_cmpeq_epi8(chunk, _mm256_set1_epi8(b'"' as i8));
        let backslash = _mm256_cmpeq_epi8(chunk, _mm256_set1_epi8(b'\\' as i8));
        let control = _mm256_cmpeq_epi8(_mm256_min_epu8(chunk, control_max), chunk);
        let special = _mm256_or_si256(_mm256_or_si256(quote, backslash), control);
        let mask = _mm256_movemask_epi8(special) as u32;
        if mask != 0 {
            return pos + mask.trailing_zeros() as usize;
        }
        pos += 32;
    }
    scalar::scan_string_end(buf, pos)
}

fn scan_string_end_avx512(buf: &[u8], pos: usize) -> usize {
    // SAFETY: backend selected only after avx512f+avx512bw were detected.
    unsafe { scan_string_end_avx512_impl(buf, pos) }
}

#[target_feature(enable = "avx512f,avx512bw")]
unsafe fn scan_string_end_avx512_impl(buf: &[u8], mut pos: usize) -> usize {
    while pos + 64 <= buf.len() {
        let chunk = _mm512_loadu_epi8(buf.as_ptr().add(pos) as *const i8);
        let special = _mm512_cmpeq_epi8_mask(chunk, _mm512_set1_epi8(b'"' as i8))
            | _mm512_cmpeq_epi8_mask(chunk, _mm512_set1_epi8(b'\\' as i8))
            | _mm512_cmple_epu8_mask(chunk, _mm512_set1_epi8(0x1F));
        if special != 0 {
            return pos + special.trailing_zeros() as usize;
        }
        pos += 64;
    }
    scalar::scan_string_end(buf, pos)
}

// ---------------------------------------------------------------------------
// validate_number_chars
// ---------------------------------------------------------------------------

fn validate_number_chars_sse2(buf: &[u8], start: usize, end: usize) -> bool {
    // SAFETY: backend selected only after sse2 was detected.
    unsafe { validate_number_chars_sse2_impl(buf, start, end) }
}

#[target_feature(enable = "sse2")]
unsafe fn validate_number_chars_sse2_impl(buf: &[u8], start: usize, end: usize) -> bool {
    let below_zero = _mm_set1_epi8(b'0' as i8 - 1);
    let above_nine = _mm_set1_epi8(b'9' as i8 + 1);
    let mut pos = start;
    while pos + 16 <= end {
        let chunk = _mm_loadu_si128(buf.as_ptr().add(pos) as *const __m128i);
        // Signed range compare is safe here: bytes >= 0x80 are negative, fail
        // the digit test, and equal none of the sign/dot/exponent bytes.
        let digit = _mm_and_si128(
            _mm_cmpgt_epi8(chunk, below_zero),
            _mm_cmpgt_epi8(above_nine, chunk),
        );
        let marks = _mm_or_si128(
            _mm_or_si128(
                _mm_cmpeq_epi8(chunk, _mm_set1_epi8(b'-' as i8)),
                _mm_cmpeq_epi8(chunk, _mm_set1_epi8(b'+' as i8)),
            ),
            _mm_or_si128(
                _mm_cmpeq_epi8(chunk, _mm_set1_epi8(b'.' as i8)),
                _mm_or_si128(
                    _mm_cmpeq_epi8(chunk, _mm_set1_epi8(b'e' as i8)),
                    _mm_cmpeq_epi8(chunk, _mm_set1_epi8(b'E' as i8)),
                ),
            ),
        );
        let valid = _mm_or_si128(digit, marks);
        if _mm_movemask_epi8(valid) as u32 != 0xFFFF {
            return false;
        }
        pos += 16;
    }
    scalar::validate_number_chars(buf, pos, end)
}

fn validate_number_chars_avx2(buf: &[u8], start: usize, end: usize) -> bool {
    // SAFETY: backend selected only after avx2 was detected.
    unsafe { validate_number_chars_avx2_impl(buf, start, end) }
}

#[target_feature(enable = "avx2")]
unsafe fn validate_number_chars_avx2_impl(buf: &[u8], start: usize, end: usize) -> bool {
    let below_zero = _mm256_set1_epi8(b'0' as i8 - 1);
    let above_nine = _mm256_set1_epi8(b'9' as i8 + 1);
    let mut pos = start;
    while pos + 32 <= end {
        let chunk = _mm256_loadu_si256(buf.as_ptr().add(pos) as *const __m256i);
        let digit = _mm256_and_si256(
            _mm256_cmpgt_epi8(chunk, below_zero),
            _mm256_cmpgt_epi8(above_nine, chunk),
        );
        let marks = _mm256_or_si256(
            _mm256_or_si256(
                _mm256_cmpeq_epi8(chunk, _mm256_set1_epi8(b'-' as i8)),
                _mm256_cmpeq_epi8(chunk, _mm256_set1_epi8(b'+' as i8)),
            ),
            _mm256_or_si256(
                _mm256_cmpeq_epi8(chunk, _mm256_set1_epi8(b'.' as i8)),
                _mm256_or_si256(
                    _mm256_cmpeq_epi8(chunk, _mm256_set1_epi8(b'e' as i8)),
                    _mm256_cmpeq_epi8(chunk, _mm256_set1_epi8(b'E' as i8)),
                ),
            ),
        );
        let valid = _mm256_or_si256(digit, marks);
        if _mm256_movemask_epi8(valid) as u32 != 0xFFFF_FFFF {
            return false;
        }
        pos += 32;
    }
    scalar::validate_number_chars(buf, pos, end)
}

fn validate_number_chars_avx512(buf: &[u8], start: usize, end: usize) -> bool {
    // SAFETY: backend selected only after avx512f+avx512bw were detected.
    unsafe { validate_number_chars_avx512_impl(buf, start, end) }
}

#[target_feature(enable = "avx512f,avx512bw")]
unsafe fn validate_number_chars_avx512_impl(buf: &[u8], start: usize, end: usize) -> bool {
    let mut pos = start;
    while pos + 64 <= end {
        let chunk = _mm512_loadu_epi8(buf.as_ptr().add(pos) as *const i8);
        let digit = _mm512_cmpge_epu8_mask(chunk, _mm512_set1_epi8(b'0' as i8))
            & _mm512_cmple_epu8_mask(chunk, _mm512_set1_epi8(b'9' as i8));
        let valid = digit
            | _mm512_cmpeq_epi8_mask(chunk, _mm512_set1_epi8(b'-' as i8))
            | _mm512_cmpeq_epi8_mask(chunk, _mm512_set1_epi8(b'+' as i8))
            | _mm512_cmpeq_epi8_mask(chunk, _mm512_set1_epi8(b'.' as i8))
            | _mm512_cmpeq_epi8_mask(chunk, _mm512_set1_epi8(b'e' as i8))
            | _mm512_cmpeq_epi8_mask(chunk, _mm512_set1_epi8(b'E' as i8));
        if valid != u64::MAX {
            return false;
        }
        pos += 64;
    }
    scalar::validate_number_chars(buf, pos, end)
}

// ---------------------------------------------------------------------------
// match_literal
//
// JSON literals are 4 or 5 bytes, so one 16-byte compare covers every
// backend width; the wider backends share this implementation.
// ---------------------------------------------------------------------------

fn match_literal_sse2(buf: &[u8], pos: usize, literal: &[u8]) -> bool {
    if literal.len() > 16 || pos + 16 > buf.len() {
        // No room for a full vector load near the end of input.
        return scalar::match_literal(buf, pos, literal);
    }
    // SAFETY: backend selected only after sse2 was detected; bounds checked.
    unsafe { match_literal_sse2_impl(buf, pos, literal) }
}

#[target_feature(enable = "sse2")]
unsafe fn match_literal_sse2_impl(buf: &[u8], pos: usize, literal: &[u8]) -> bool {
    let mut padded = [0u8; 16];
    padded[..literal.len()].copy_from_slice(literal);
    let chunk = _mm_loadu_si128(buf.as_ptr().add(pos) as *const __m128i);
    let expected = _mm_loadu_si128(padded.as_ptr() as *const __m128i);
    let eq = _mm_movemask_epi8(_mm_cmpeq_epi8(chunk, expected)) as u32;
    let want = (1u32 << literal.len()) - 1;
    eq & want == want
}

// ---------------------------------------------------------------------------
// validate_utf8
//
// The vector fast path skips all-ASCII chunks; the first chunk containing a
// high bit hands the rest of the range to the scalar validator. The skipped
// prefix is pure ASCII and carries no pending multi-byte state, so the
// result equals the scalar result.
// ---------------------------------------------------------------------------

fn validate_utf8_sse2(buf: &[u8], start: usize, end: usize) -> bool {
    // SAFETY: backend selected only after sse2 was detected.
    unsafe { validate_utf8_sse2_impl(buf, start, end) }
}

#[target_feature(enable = "sse2")]
unsafe fn validate_utf8_sse2_impl(buf: &[u8], start: usize, end: usize) -> bool {
    let mut pos = start;
    while pos + 16 <= end {
        let chunk = _mm_loadu_si128(buf.as_ptr().add(pos) as *const __m128i);
        if _mm_movemask_epi8(chunk) != 0 {
            return scalar::validate_utf8(buf, pos, end);
        }
        pos += 16;
    }
    scalar::validate_utf8(buf, pos, end)
}

fn validate_utf8_avx2(buf: &[u8], start: usize, end: usize) -> bool {
    // SAFETY: backend selected only after avx2 was detected.
    unsafe { validate_utf8_avx2_impl(buf, start, end) }
}

#[target_feature(enable = "avx2")]
unsafe fn validate_utf8_avx2_impl(buf: &[u8], start: usize, end: usize) -> bool {
    let mut pos = start;
    while pos + 32 <= end {
        let chunk = _mm256_loadu_si256(buf.as_ptr().add(pos) as *const __m256i);
        if _mm256_movemask_epi8(chunk) != 0 {
            return scalar::validate_utf8(buf, pos, end);
        }
        pos += 32;
    }
    scalar::validate_utf8(buf, pos, end)
}

fn validate_utf8_avx512(buf: &[u8], start: usize, end: usize) -> bool {
    // SAFETY: backend selected only after avx512f+avx512bw were detected.
    unsafe { validate_utf8_avx512_impl(buf, start, end) }
}

#[target_feature(enable = "avx512f,avx512bw")]
unsafe fn validate_utf8_avx512_impl(buf: &[u8], start: usize, end: usize) -> bool {
    let mut pos = start;
    while pos + 64 <= end {
        let chunk = _mm512_loadu_epi8(buf.as_ptr().add(pos) as *const i8);
        if _mm512_movepi8_mask(chunk) != 0 {
            return scalar::validate_utf8(buf, pos, end);
        }
        pos += 64;
    }
    scalar::validate_utf8(buf, pos, end)
}

// ---------------------------------------------------------------------------
// find_structural_chars
// ---------------------------------------------------------------------------

fn find_structural_chars_sse2(buf: &[u8], start: usize, end: usize, out: &mut Vec<Structural>) {
    // SAFETY: backend selected only after sse2 was detected.
    unsafe { find_structural_chars_sse2_impl(buf, start, end, out) }
}

#[target_feature(enable = "sse2")]
unsafe fn find_structural_chars_sse2_impl(
    buf: &[u8],
    start: usize,
    end: usize,
    out: &mut Vec<Structural>,
) {
    let mut pos = start;
    while pos + 16 <= end {
        let chunk = _mm_loadu_si128(buf.as_ptr().add(pos) as *const __m128i);
        let mut structural = _mm_cmpeq_epi8(chunk, _mm_set1_epi8(b'{' as i8));
        for b in [b'}', b'[', b']', b':', b',', b'"', b'\\'] {
            structural = _mm_or_si128(structural, _mm_cmpeq_epi8(chunk, _mm_set1_epi8(b as i8)));
        }
        let mut mask = _mm_movemask_epi8(structural) as u32;
        while mask != 0 {
            let at = pos + mask.trailing_zeros() as usize;
            if let Some(class) = StructuralClass::from_byte(buf[at]) {
                out.push((at, class));
            }
            mask &= mask - 1;
        }
        pos += 16;
    }
    scalar::find_structural_chars(buf, pos, end, out);
}

fn find_structural_chars_avx2(buf: &[u8], start: usize, end: usize, out: &mut Vec<Structural>) {
    // SAFETY: backend selected only after avx2 was detected.
    unsafe { find_structural_chars_avx2_impl(buf, start, end, out) }
}

#[target_feature(enable = "avx2")]
unsafe fn find_structural_chars_avx2_impl(
    buf: &[u8],
    start: usize,
    end: usize,
    out: &mut Vec<Structural>,
) {
    let mut pos = start;
    while pos + 32 <= end {
        let chunk = _mm256_loadu_si256(buf.as_ptr().add(pos) as *const __m256i);
        let mut structural = _mm256_cmpeq_epi8(chunk, _mm256_set1_epi8(b'{' as i8));
        for b in [b'}', b'[', b']', b':', b',', b'"', b'\\'] {
            structural = _mm256_or_si256(
                structural,
                _mm256_cmpeq_epi8(chunk, _mm256_set1_epi8(b as i8)),
            );
        }
        let mut mask = _mm256_movemask_epi8(structural) as u32;
        while mask != 0 {
            let at = pos + mask.trailing_zeros() as usize;
            if let Some(class) = StructuralClass::from_byte(buf[at]) {
                out.push((at, class));
            }
            mask &= mask - 1;
        }
        pos += 32;
    }
    scalar::find_structural_chars(buf, pos, end, out);
}

fn find_structural_chars_avx512(buf: &[u8], start: usize, end: usize, out: &mut Vec<Structural>) {
    // SAFETY: backend selected only after avx512f+avx512bw were detected.
    unsafe { find_structural_chars_avx512_impl(buf, start, end, out) }
}

#[target_feature(enable = "avx512f,avx512bw")]
unsafe fn find_structural_chars_avx512_impl(
    buf: &[u8],
    start: usize,
    end: usize,
    out: &mut Vec<Structural>,
) {
    let mut pos = start;
    while pos + 64 <= end {
        let chunk = _mm512_loadu_epi8(buf.as_ptr().add(pos) as *const i8);
        let mut mask = _mm512_cmpeq_epi8_mask(chunk, _mm512_set1_epi8(b'{' as i8));
        for b in [b'}', b'[', b']', b':', b',', b'"', b'\\'] {
            mask |= _mm512_cmpeq_epi8_mask(chunk, _mm512_set1_epi8(b as i8));
        }
        while mask != 0 {
            let at = pos + mask.trailing_zeros() as usize;
            if let Some(class) = StructuralClass::from_byte(buf[at]) {
                out.push((at, class));
            }
            mask &= mask - 1;
        }
        pos += 64;
    }
    scalar::find_structural_chars(buf, pos, end, out);
}
