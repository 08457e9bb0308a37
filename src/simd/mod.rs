//! SIMD scanning primitives with runtime backend selection.
//!
//! Each primitive has one implementation per supported vector width (64
//! bytes for AVX-512, 32 for AVX2, 16 for SSE2/NEON) plus a scalar
//! reference implementation. All implementations of a primitive are
//! byte-identical in output for identical input; the scalar implementation
//! is the cross-validation baseline and the tests in this module hold the
//! vector backends to it.
//!
//! A [`Backend`] is a table of function pointers selected once per parse:
//! the widest backend that is both compiled in and runtime-detected wins,
//! honoring the `enable_*` flags in [`ParseConfig`]. With SIMD disabled or
//! unsupported, the scalar backend is used unconditionally.

pub(crate) mod scalar;

#[cfg(target_arch = "aarch64")]
pub(crate) mod neon;

#[cfg(target_arch = "x86_64")]
pub(crate) mod x86;

use crate::cpu::SimdCapabilities;
use crate::ParseConfig;

/// Classification of a structural byte found by [`Backend::find_structural_chars`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralClass {
    ObjectOpen,
    ObjectClose,
    ArrayOpen,
    ArrayClose,
    Colon,
    Comma,
    Quote,
    Backslash,
}

impl StructuralClass {
    /// Classify a byte, `None` for non-structural bytes.
    #[inline]
    pub fn from_byte(b: u8) -> Option<StructuralClass> {
        match b {
            b'{' => Some(StructuralClass::ObjectOpen),
            b'}' => Some(StructuralClass::ObjectClose),
            b'[' => Some(StructuralClass::ArrayOpen),
            b']' => Some(StructuralClass::ArrayClose),
            b':' => Some(StructuralClass::Colon),
            b',' => Some(StructuralClass::Comma),
            b'"' => Some(StructuralClass::Quote),
            b'\\' => Some(StructuralClass::Backslash),
            _ => None,
        }
    }
}

/// A structural byte position and its classification.
pub(crate) type Structural = (usize, StructuralClass);

/// Function-pointer table for one vector width.
///
/// Selected once at orchestrator start and threaded through the parser,
/// the indexer, and the scheduler's worker tasks.
pub(crate) struct Backend {
    pub name: &'static str,
    /// Advance past space/tab/LF/CR, returning the first non-whitespace
    /// position (or end of input).
    pub skip_whitespace: fn(&[u8], usize) -> usize,
    /// Position of the next `"`, `\`, or control byte (< 0x20), or end of
    /// input if none remains.
    pub scan_string_end: fn(&[u8], usize) -> usize,
    /// True if every byte in `start..end` is in `{0-9 - + . e E}`.
    pub validate_number_chars: fn(&[u8], usize, usize) -> bool,
    /// Fixed-length compare against a literal (`true`/`false`/`null`).
    pub match_literal: fn(&[u8], usize, &[u8]) -> bool,
    /// Validate UTF-8 over `start..end`; a multi-byte sequence truncated at
    /// `end` is invalid.
    pub validate_utf8: fn(&[u8], usize, usize) -> bool,
    /// Append `(position, class)` for every structural byte in `start..end`,
    /// in position order.
    pub find_structural_chars: fn(&[u8], usize, usize, &mut Vec<Structural>),
}

pub(crate) static SCALAR: Backend = Backend {
    name: "scalar",
    skip_whitespace: scalar::skip_whitespace,
    scan_string_end: scalar::scan_string_end,
    validate_number_chars: scalar::validate_number_chars,
    match_literal: scalar::match_literal,
    validate_utf8: scalar::validate_utf8,
    find_structural_chars: scalar::find_structural_chars,
};

/// Pick the widest enabled, detected backend (the SIMD waterfall).
pub(crate) fn select(config: &ParseConfig, caps: &SimdCapabilities) -> &'static Backend {
    if !config.enable_simd {
        return &SCALAR;
    }

    #[cfg(target_arch = "x86_64")]
    {
        if config.enable_avx512 && caps.avx512f && caps.avx512bw {
            return &x86::AVX512;
        }
        if config.enable_avx2 && caps.avx2 {
            return &x86::AVX2;
        }
        if caps.sse2 {
            return &x86::SSE2;
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        if config.enable_neon && caps.neon {
            return &neon::NEON;
        }
    }

    let _ = caps;
    &SCALAR
}

/// Every backend compiled in for this target, scalar first. Used by the
/// cross-backend determinism tests.
#[cfg(test)]
pub(crate) fn compiled_backends() -> Vec<&'static Backend> {
    #[allow(unused_mut)]
    let mut backends = vec![&SCALAR];
    #[cfg(target_arch = "x86_64")]
    {
        let caps = crate::cpu::detect();
        if caps.sse2 {
            backends.push(&x86::SSE2);
        }
        if caps.avx2 {
            backends.push(&x86::AVX2);
        }
        if caps.avx512f && caps.avx512bw {
            backends.push(&x86::AVX512);
        }
    }
    #[cfg(target_arch = "aarch64")]
    {
        if crate::cpu::detect().neon {
            backends.push(&neon::NEON);
        }
    }
    backends
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    // Buffers exercising every alignment and length regime around the
    // 16/32/64-byte chunk boundaries, plus adversarial byte mixes.
    fn corpora() -> Vec<Vec<u8>> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x7472_626a);
        let mut out: Vec<Vec<u8>> = vec![
            Vec::new(),
            b" ".to_vec(),
            b"    \t\n\r  [1, 2, 3]   ".to_vec(),
            b"\"hello \\\" world\"".to_vec(),
            vec![b' '; 200],
            b"{\"k\":[true,false,null,1.5e10]}".to_vec(),
            "日本語のテキスト\"と\\エスケープ".as_bytes().to_vec(),
            vec![0xFF, 0x80, 0x01, b'"'],
        ];
        for len in [15, 16, 17, 31, 32, 33, 63, 64, 65, 127, 500] {
            let mut buf = Vec::with_capacity(len);
            for _ in 0..len {
                // Biased toward whitespace and structural bytes.
                let b = match rng.gen_range(0..10) {
                    0 => b' ',
                    1 => b'\t',
                    2 => b'"',
                    3 => b'\\',
                    4 => b',',
                    5 => b'{',
                    6 => rng.gen_range(b'0'..=b'9'),
                    7 => rng.gen_range(0x00..0x20),
                    _ => rng.gen::<u8>(),
                };
                buf.push(b);
            }
            out.push(buf);
        }
        out
    }

    #[test]
    fn backends_match_scalar_on_every_primitive() {
        let backends = compiled_backends();
        for buf in corpora() {
            let len = buf.len();
            let starts = [0, 1, len / 2, len.saturating_sub(1), len];
            for backend in &backends {
                for &start in &starts {
                    let start = start.min(len);
                    assert_eq!(
                        (backend.skip_whitespace)(&buf, start),
                        (SCALAR.skip_whitespace)(&buf, start),
                        "skip_whitespace diverged: backend={} start={start}",
                        backend.name
                    );
                    assert_eq!(
                        (backend.scan_string_end)(&buf, start),
                        (SCALAR.scan_string_end)(&buf, start),
                        "scan_string_end diverged: backend={} start={start}",
                        backend.name
                    );
                    assert_eq!(
                        (backend.validate_number_chars)(&buf, start, len),
                        (SCALAR.validate_number_chars)(&buf, start, len),
                        "validate_number_chars diverged: backend={} start={start}",
                        backend.name
                    );
                    assert_eq!(
                        (backend.validate_utf8)(&buf, start, len),
                        (SCALAR.validate_utf8)(&buf, start, len),
                        "validate_utf8 diverged: backend={} start={start}",
                        backend.name
                    );
                    for lit in [&b"true"[..], b"false", b"null"] {
                        assert_eq!(
                            (backend.match_literal)(&buf, start, lit),
                            (SCALAR.match_literal)(&buf, start, lit),
                            "match_literal diverged: backend={} start={start}",
                            backend.name
                        );
                    }
                    let mut got = Vec::new();
                    let mut want = Vec::new();
                    (backend.find_structural_chars)(&buf, start, len, &mut got);
                    (SCALAR.find_structural_chars)(&buf, start, len, &mut want);
                    assert_eq!(
                        got, want,
                        "find_structural_chars diverged: backend={} start={start}",
                        backend.name
                    );
                }
            }
        }
    }

    #[test]
    fn skip_whitespace_is_idempotent() {
        for backend in compiled_backends() {
            for buf in corpora() {
                let once = (backend.skip_whitespace)(&buf, 0);
                assert_eq!((backend.skip_whitespace)(&buf, once), once);
            }
        }
    }

    #[test]
    fn select_honors_disable_flag() {
        let config = ParseConfig::default().with_simd(false);
        let backend = select(&config, &crate::cpu::detect());
        assert_eq!(backend.name, "scalar");
    }
}
