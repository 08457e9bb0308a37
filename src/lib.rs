//! # turbojson
//!
//! SIMD-accelerated JSON parsing with optional parallel decomposition of
//! large documents.
//!
//! The parser selects the widest vector backend the CPU supports at
//! runtime (AVX-512, AVX2, or SSE2 on x86_64; NEON on aarch64) and falls
//! back to scalar code everywhere else. A root array or object above a
//! size threshold is split at its top-level boundaries and parsed by
//! worker threads; output, including error positions, is byte-for-byte
//! identical to the sequential path.
//!
//! ## Module Organization
//!
//! - [`cpu`] - runtime CPU feature detection
//! - [`simd`] - scanning primitives, one implementation per vector width
//! - [`value`] - the parsed [`Value`] tree and the [`Visit`] traversal
//! - [`ser`] - compact serialization back to JSON text
//!
//! ## Quick Start
//!
//! ```
//! use turbojson::parse_str;
//!
//! let doc = parse_str(r#"{"name": "turbo", "versions": [1, 2, 3]}"#).unwrap();
//! assert_eq!(doc.get("name").unwrap().as_str().unwrap(), "turbo");
//! assert_eq!(doc.get("versions").unwrap().len(), 3);
//! ```
//!
//! Malformed input reports what went wrong and where:
//!
//! ```
//! use turbojson::{parse_str, ErrorCode};
//!
//! let err = parse_str("[1, 2,]").unwrap_err();
//! assert_eq!(err.code, ErrorCode::InvalidSyntax);
//! assert_eq!(err.line, 1);
//! assert_eq!(err.column, 7);
//! ```

pub mod cpu;
mod error;
mod index;
mod parallel;
mod parser;
pub mod ser;
pub mod simd;
mod unicode;
mod value;

pub use crate::cpu::{detect, SimdCapabilities};
pub use crate::error::{ErrorCode, ParseError};
pub use crate::ser::to_json_string;
pub use crate::value::{walk, Value, Visit};

use crate::error::position_of;

/// Default nesting depth limit.
pub const DEFAULT_MAX_DEPTH: usize = 1000;
/// Default minimum document size for parallel decomposition.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 64 * 1024;

/// Tuning knobs for a parse.
///
/// The defaults enable every acceleration the host supports. The `with_*`
/// builders exist mostly for benchmarking and for pinning down behavior in
/// tests; disabling a backend never changes parse results, only speed.
#[derive(Debug, Clone)]
pub struct ParseConfig {
    /// Maximum container nesting depth before `StackOverflow`.
    pub max_depth: usize,
    /// Master switch for all vector backends.
    pub enable_simd: bool,
    /// Allow the AVX2 backend (x86_64).
    pub enable_avx2: bool,
    /// Allow the AVX-512 backend (x86_64).
    pub enable_avx512: bool,
    /// Allow the NEON backend (aarch64).
    pub enable_neon: bool,
    /// Allow parallel decomposition of large root containers.
    pub enable_parallel: bool,
    /// Minimum input size, in bytes, before decomposition is attempted.
    pub parallel_threshold_bytes: usize,
    /// Worker thread count for decomposition.
    pub thread_count: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig {
            max_depth: DEFAULT_MAX_DEPTH,
            enable_simd: true,
            enable_avx2: true,
            enable_avx512: true,
            enable_neon: true,
            enable_parallel: true,
            parallel_threshold_bytes: DEFAULT_PARALLEL_THRESHOLD,
            thread_count: default_thread_count(),
        }
    }
}

fn default_thread_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl ParseConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_simd(mut self, enable: bool) -> Self {
        self.enable_simd = enable;
        self
    }

    pub fn with_avx2(mut self, enable: bool) -> Self {
        self.enable_avx2 = enable;
        self
    }

    pub fn with_avx512(mut self, enable: bool) -> Self {
        self.enable_avx512 = enable;
        self
    }

    pub fn with_neon(mut self, enable: bool) -> Self {
        self.enable_neon = enable;
        self
    }

    pub fn with_parallel(mut self, enable: bool) -> Self {
        self.enable_parallel = enable;
        self
    }

    pub fn with_parallel_threshold(mut self, bytes: usize) -> Self {
        self.parallel_threshold_bytes = bytes;
        self
    }

    pub fn with_thread_count(mut self, threads: usize) -> Self {
        self.thread_count = threads;
        self
    }
}

/// Parse a JSON document with the default configuration.
pub fn parse(input: &[u8]) -> Result<Value, ParseError> {
    parse_with(input, &ParseConfig::default())
}

/// Parse a JSON document.
///
/// Exactly one top-level value is accepted, surrounded by optional
/// whitespace. Errors carry the byte offset and 1-based line/column of the
/// failure in `input`.
pub fn parse_with(input: &[u8], config: &ParseConfig) -> Result<Value, ParseError> {
    let caps = cpu::detect();
    let backend = simd::select(config, &caps);
    parse_root(input, config, backend).map_err(|e| e.locate(input))
}

fn parse_root(
    input: &[u8],
    config: &ParseConfig,
    backend: &'static simd::Backend,
) -> Result<Value, ParseError> {
    let start = (backend.skip_whitespace)(input, 0);
    let parallel_eligible = config.enable_parallel
        && config.thread_count > 1
        && input.len() - start >= config.parallel_threshold_bytes
        && matches!(input.get(start), Some(&(b'[' | b'{')));

    if parallel_eligible {
        if let Some((value, end)) = parallel::parse_container(input, start, backend, config)? {
            let rest = (backend.skip_whitespace)(input, end);
            if rest < input.len() {
                return Err(ParseError::new(
                    ErrorCode::ExtraTokens,
                    "unexpected content after top-level value",
                    rest,
                ));
            }
            return Ok(value);
        }
        // Indexing declined; the sequential parser owns this input.
    }

    parser::Parser::new(input, 0, 0, backend, config).parse_document()
}

/// Parse a JSON document from a string slice.
pub fn parse_str(input: &str) -> Result<Value, ParseError> {
    parse(input.as_bytes())
}

/// [`parse_str`] with an explicit configuration.
pub fn parse_str_with(input: &str, config: &ParseConfig) -> Result<Value, ParseError> {
    parse_with(input.as_bytes(), config)
}

/// Parse a JSON document from UTF-16 code units.
///
/// The input is transcoded to UTF-8 first; reported byte offsets refer to
/// the transcoded buffer, while line numbers match the original text.
pub fn parse_utf16(input: &[u16]) -> Result<Value, ParseError> {
    parse_utf16_with(input, &ParseConfig::default())
}

/// [`parse_utf16`] with an explicit configuration.
pub fn parse_utf16_with(input: &[u16], config: &ParseConfig) -> Result<Value, ParseError> {
    let mut text = String::with_capacity(input.len());
    for unit in char::decode_utf16(input.iter().copied()) {
        match unit {
            Ok(c) => text.push(c),
            Err(_) => {
                // The error position is the end of the valid UTF-8 prefix.
                let offset = text.len();
                let (line, column) = position_of(text.as_bytes(), offset);
                return Err(ParseError {
                    code: ErrorCode::InvalidUnicode,
                    message: "invalid UTF-16 input".to_string(),
                    offset,
                    line,
                    column,
                });
            }
        }
    }
    parse_with(text.as_bytes(), config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_fully_enabled() {
        let config = ParseConfig::default();
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert!(config.enable_simd);
        assert!(config.enable_parallel);
        assert!(config.thread_count >= 1);
    }

    #[test]
    fn parse_str_round_trips() {
        let doc = parse_str(r#"{"a": [1, true, null], "b": "x"}"#).unwrap();
        assert_eq!(to_json_string(&doc), r#"{"a":[1,true,null],"b":"x"}"#);
    }

    #[test]
    fn errors_locate_in_the_original_input() {
        let err = parse(b"{\n  \"a\": 01\n}").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidNumber);
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 8);
    }

    #[test]
    fn parse_utf16_accepts_surrogate_pairs() {
        let text: Vec<u16> = "[\"😀\"]".encode_utf16().collect();
        let doc = parse_utf16(&text).unwrap();
        assert_eq!(doc.get_index(0).unwrap().as_str().unwrap(), "😀");
    }

    #[test]
    fn parse_str_with_honors_the_config() {
        let doc = r#"[[["deep"]]]"#;
        let config = ParseConfig::default().with_max_depth(2);
        let err = parse_str_with(doc, &config).unwrap_err();
        assert_eq!(err.code, ErrorCode::StackOverflow);
        assert!(parse_str_with(doc, &ParseConfig::default()).is_ok());
    }

    #[test]
    fn parse_utf16_rejects_lone_surrogates() {
        let err = parse_utf16(&[b'[' as u16, 0xD800, b']' as u16]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidUnicode);

        // The position points at the end of the valid prefix.
        let err = parse_utf16(&[b'[' as u16, b'1' as u16, b',' as u16, 0xDC00]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidUnicode);
        assert_eq!(err.offset, 3);
        assert_eq!((err.line, err.column), (1, 4));
    }
}
