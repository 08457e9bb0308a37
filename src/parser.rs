//! Depth-bounded recursive descent over UTF-8 input.
//!
//! The parser walks one byte span, delegating all bulk scanning (whitespace
//! runs, string bodies, number characters, literals, UTF-8 validation) to
//! the SIMD backend selected for this parse. Errors carry absolute byte
//! offsets: a parser running over a worker's subspan adds its `base_offset`
//! so that positions match what the sequential path would report.

use indexmap::IndexMap;

use crate::error::{ErrorCode, ParseError};
use crate::simd::Backend;
use crate::unicode;
use crate::value::Value;
use crate::ParseConfig;

pub(crate) struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    /// Current nesting depth; the document root starts at 0, a worker task
    /// inside a decomposed container starts at 1.
    depth: usize,
    /// Added to every reported offset.
    base_offset: usize,
    backend: &'static Backend,
    config: &'a ParseConfig,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(
        input: &'a [u8],
        base_offset: usize,
        depth: usize,
        backend: &'static Backend,
        config: &'a ParseConfig,
    ) -> Self {
        Parser {
            input,
            pos: 0,
            depth,
            base_offset,
            backend,
            config,
        }
    }

    fn err(&self, code: ErrorCode, message: impl Into<String>) -> ParseError {
        self.err_at(code, message, self.pos)
    }

    fn err_at(&self, code: ErrorCode, message: impl Into<String>, pos: usize) -> ParseError {
        ParseError::new(code, message, self.base_offset + pos)
    }

    fn skip_whitespace(&mut self) {
        self.pos = (self.backend.skip_whitespace)(self.input, self.pos);
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Parse exactly one document: a single value with nothing but
    /// whitespace around it.
    pub(crate) fn parse_document(&mut self) -> Result<Value, ParseError> {
        self.skip_whitespace();
        if self.pos >= self.input.len() {
            return Err(self.err(ErrorCode::UnexpectedEnd, "empty input"));
        }
        let value = self.parse_value()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.err(
                ErrorCode::ExtraTokens,
                "unexpected content after top-level value",
            ));
        }
        Ok(value)
    }

    /// Parse one value and leave `pos` just past it. Used directly by the
    /// parallel scheduler's worker tasks.
    pub(crate) fn parse_value(&mut self) -> Result<Value, ParseError> {
        match self.peek() {
            None => Err(self.err(ErrorCode::UnexpectedEnd, "unexpected end of input")),
            Some(b'{') => self.parse_object(),
            Some(b'[') => self.parse_array(),
            Some(b'"') => self.parse_string().map(Value::String),
            Some(b't') => self.parse_literal(b"true", Value::Bool(true)),
            Some(b'f') => self.parse_literal(b"false", Value::Bool(false)),
            Some(b'n') => self.parse_literal(b"null", Value::Null),
            Some(b'-' | b'0'..=b'9') => self.parse_number(),
            Some(b) => Err(self.err(
                ErrorCode::InvalidSyntax,
                format!("unexpected character '{}'", b.escape_ascii()),
            )),
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn skip_trailing_whitespace(&mut self) -> bool {
        self.skip_whitespace();
        self.pos >= self.input.len()
    }

    fn parse_literal(&mut self, literal: &'static [u8], value: Value) -> Result<Value, ParseError> {
        if (self.backend.match_literal)(self.input, self.pos, literal) {
            self.pos += literal.len();
            Ok(value)
        } else {
            let text = core::str::from_utf8(literal).unwrap_or("literal");
            Err(self.err(
                ErrorCode::InvalidSyntax,
                format!("expected '{text}'"),
            ))
        }
    }

    fn parse_number(&mut self) -> Result<Value, ParseError> {
        let start = self.pos;
        let mut end = self.pos;
        while end < self.input.len() && !is_value_delimiter(self.input[end]) {
            end += 1;
        }
        if !(self.backend.validate_number_chars)(self.input, start, end)
            || !number_grammar_ok(&self.input[start..end])
        {
            return Err(self.err_at(ErrorCode::InvalidNumber, "invalid number", start));
        }
        // The token is ASCII by construction.
        let text = core::str::from_utf8(&self.input[start..end])
            .map_err(|_| self.err_at(ErrorCode::InvalidNumber, "invalid number", start))?;
        let number: f64 = text
            .parse()
            .map_err(|_| self.err_at(ErrorCode::InvalidNumber, "invalid number", start))?;
        self.pos = end;
        Ok(Value::Number(number))
    }

    /// Parse a string, `pos` at the opening quote. Also used for object
    /// keys.
    pub(crate) fn parse_string(&mut self) -> Result<String, ParseError> {
        self.pos += 1;
        let mut out: Vec<u8> = Vec::new();
        loop {
            let next = (self.backend.scan_string_end)(self.input, self.pos);
            if next > self.pos {
                // Raw segment: terminators are ASCII, so a multi-byte
                // sequence never straddles a segment boundary and the
                // segment can be validated on its own.
                if !(self.backend.validate_utf8)(self.input, self.pos, next) {
                    return Err(self.err(ErrorCode::InvalidString, "invalid UTF-8 in string"));
                }
                out.extend_from_slice(&self.input[self.pos..next]);
                self.pos = next;
            }
            match self.peek() {
                None => {
                    return Err(self.err(ErrorCode::UnexpectedEnd, "unterminated string"));
                }
                Some(b'"') => {
                    self.pos += 1;
                    return String::from_utf8(out)
                        .map_err(|_| self.err(ErrorCode::InvalidString, "invalid UTF-8 in string"));
                }
                Some(b'\\') => self.parse_escape(&mut out)?,
                Some(_) => {
                    return Err(self.err(
                        ErrorCode::InvalidString,
                        "control character in string",
                    ));
                }
            }
        }
    }

    fn parse_escape(&mut self, out: &mut Vec<u8>) -> Result<(), ParseError> {
        let escape_pos = self.pos;
        self.pos += 1;
        let b = match self.peek() {
            Some(b) => b,
            None => {
                return Err(self.err(ErrorCode::UnexpectedEnd, "unterminated string"));
            }
        };
        match b {
            b'"' | b'\\' | b'/' => out.push(b),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'u' => {
                let (cp, consumed) = unicode::decode_escape(self.input, self.pos + 1)
                    .map_err(|e| self.err_at(ErrorCode::InvalidUnicode, e.reason(), escape_pos))?;
                if !unicode::encode_utf8(cp, out) {
                    return Err(self.err_at(
                        ErrorCode::InvalidUnicode,
                        "escape is not a valid codepoint",
                        escape_pos,
                    ));
                }
                self.pos += consumed;
            }
            _ => {
                return Err(self.err_at(
                    ErrorCode::InvalidEscape,
                    format!("invalid escape character '{}'", b.escape_ascii()),
                    escape_pos,
                ));
            }
        }
        self.pos += 1;
        Ok(())
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > self.config.max_depth {
            return Err(self.err(ErrorCode::StackOverflow, "nesting depth limit exceeded"));
        }
        Ok(())
    }

    fn parse_array(&mut self) -> Result<Value, ParseError> {
        self.enter()?;
        self.pos += 1;
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
            self.depth -= 1;
            return Ok(Value::Array(Vec::new()));
        }
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            items.push(self.parse_value()?);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    self.depth -= 1;
                    return Ok(Value::Array(items));
                }
                None => {
                    return Err(self.err(ErrorCode::UnexpectedEnd, "unterminated array"));
                }
                Some(_) => {
                    return Err(self.err(ErrorCode::InvalidSyntax, "expected ',' or ']'"));
                }
            }
        }
    }

    fn parse_object(&mut self) -> Result<Value, ParseError> {
        self.enter()?;
        self.pos += 1;
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            self.depth -= 1;
            return Ok(Value::Object(IndexMap::new()));
        }
        let mut map = IndexMap::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'"') => {}
                None => {
                    return Err(self.err(ErrorCode::UnexpectedEnd, "unterminated object"));
                }
                Some(_) => {
                    return Err(self.err(ErrorCode::InvalidSyntax, "expected string key"));
                }
            }
            let key = self.parse_string()?;
            self.skip_whitespace();
            match self.peek() {
                Some(b':') => self.pos += 1,
                None => {
                    return Err(self.err(ErrorCode::UnexpectedEnd, "unterminated object"));
                }
                Some(_) => {
                    return Err(self.err(ErrorCode::InvalidSyntax, "expected ':'"));
                }
            }
            self.skip_whitespace();
            let value = self.parse_value()?;
            // Duplicate keys keep the first position, last value wins.
            map.insert(key, value);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    self.depth -= 1;
                    return Ok(Value::Object(map));
                }
                None => {
                    return Err(self.err(ErrorCode::UnexpectedEnd, "unterminated object"));
                }
                Some(_) => {
                    return Err(self.err(ErrorCode::InvalidSyntax, "expected ',' or '}'"));
                }
            }
        }
    }
}

/// Bytes that terminate an unquoted token such as a number.
#[inline]
fn is_value_delimiter(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b',' | b']' | b'}' | b':')
}

/// Full JSON number grammar over a delimiter-free token.
fn number_grammar_ok(token: &[u8]) -> bool {
    let mut i = 0;
    if token.first() == Some(&b'-') {
        i += 1;
    }
    match token.get(i) {
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => {
            while matches!(token.get(i), Some(b'0'..=b'9')) {
                i += 1;
            }
        }
        _ => return false,
    }
    if token.get(i) == Some(&b'.') {
        i += 1;
        if !matches!(token.get(i), Some(b'0'..=b'9')) {
            return false;
        }
        while matches!(token.get(i), Some(b'0'..=b'9')) {
            i += 1;
        }
    }
    if matches!(token.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(token.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        if !matches!(token.get(i), Some(b'0'..=b'9')) {
            return false;
        }
        while matches!(token.get(i), Some(b'0'..=b'9')) {
            i += 1;
        }
    }
    i == token.len()
}
