//! Parse error taxonomy and position reporting.
//!
//! Every parsing function returns a `Result` carrying a [`ParseError`];
//! malformed input is an expected, common case. Errors record the byte
//! offset where parsing failed, and the top-level entry points derive
//! 1-based line/column from that offset against the full input buffer, so
//! the parallel and sequential execution paths report identical positions.

use core::fmt;

/// The kind of failure a parse (or value accessor) produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Grammar violation: unexpected structural character or token.
    InvalidSyntax,
    /// Input ended before the current value was complete.
    UnexpectedEnd,
    /// Number token violates the JSON number grammar.
    InvalidNumber,
    /// String contains a control byte, invalid UTF-8, or is unterminated.
    InvalidString,
    /// Backslash escape other than `\" \\ \/ \b \f \n \r \t \u`.
    InvalidEscape,
    /// Malformed `\u` escape: bad hex digits or broken surrogate pairing.
    InvalidUnicode,
    /// Nesting exceeded the configured `max_depth`.
    StackOverflow,
    /// Non-whitespace bytes remained after the top-level value.
    ExtraTokens,
    /// A typed accessor was called on the wrong `Value` variant.
    TypeMismatch,
    /// Allocation failure surfaced by a binding layer. The Rust core itself
    /// aborts on allocation failure.
    OutOfMemory,
}

impl ErrorCode {
    /// Stable lowercase name, convenient for logs and bindings.
    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::InvalidSyntax => "invalid_syntax",
            ErrorCode::UnexpectedEnd => "unexpected_end",
            ErrorCode::InvalidNumber => "invalid_number",
            ErrorCode::InvalidString => "invalid_string",
            ErrorCode::InvalidEscape => "invalid_escape",
            ErrorCode::InvalidUnicode => "invalid_unicode",
            ErrorCode::StackOverflow => "stack_overflow",
            ErrorCode::ExtraTokens => "extra_tokens",
            ErrorCode::TypeMismatch => "type_mismatch",
            ErrorCode::OutOfMemory => "out_of_memory",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parse failure with position information.
///
/// `offset` is the 0-based byte offset into the original input. `line` and
/// `column` are 1-based and derived from the offset; for errors raised by
/// [`Value`](crate::Value) accessors (which have no input buffer) all three
/// position fields are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// What went wrong.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Byte offset into the input (0-based).
    pub offset: usize,
    /// Line number (1-based; 0 for non-positional errors).
    pub line: usize,
    /// Column number (1-based, counted in bytes; 0 for non-positional errors).
    pub column: usize,
}

impl ParseError {
    pub(crate) fn new(code: ErrorCode, message: impl Into<String>, offset: usize) -> Self {
        ParseError {
            code,
            message: message.into(),
            offset,
            line: 0,
            column: 0,
        }
    }

    /// Error raised by a typed accessor on the wrong variant.
    pub(crate) fn type_mismatch(expected: &'static str, found: &'static str) -> Self {
        ParseError {
            code: ErrorCode::TypeMismatch,
            message: format!("expected {expected}, found {found}"),
            offset: 0,
            line: 0,
            column: 0,
        }
    }

    /// Fill in line/column by scanning the input up to `self.offset`.
    pub(crate) fn locate(mut self, input: &[u8]) -> Self {
        let (line, column) = position_of(input, self.offset);
        self.line = line;
        self.column = column;
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(
                f,
                "{}: {} at line {}, column {} (offset {})",
                self.code, self.message, self.line, self.column, self.offset
            )
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for ParseError {}

/// Derive (line, column), both 1-based, for a byte offset.
///
/// Columns count bytes, not characters, matching the offset the SIMD
/// scanners produce. Offsets past the end of input report the position one
/// past the final byte.
pub(crate) fn position_of(input: &[u8], offset: usize) -> (usize, usize) {
    let offset = offset.min(input.len());
    let mut line = 1;
    let mut column = 1;
    for &b in &input[..offset] {
        if b == b'\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}
