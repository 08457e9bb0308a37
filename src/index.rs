//! Structural boundary indexing for parallel decomposition.
//!
//! Before an array or object is split across worker threads, a single
//! forward scan locates the byte span of every top-level element (or
//! key/value member) without parsing any of them. The scan consumes the
//! structural-character stream produced by the active SIMD backend in
//! fixed-size chunks, tracking string state and bracket depth.
//!
//! Escapes are resolved through event adjacency: a backslash inside a
//! string marks the next byte position, and a structural event landing
//! exactly there is discarded as escaped. This works across chunk
//! boundaries because the mark is kept in the scanner state.
//!
//! Indexing is best-effort. Any irregularity (unbalanced brackets,
//! unterminated strings, an empty span where an element belongs) aborts
//! with [`IndexError`] and the caller falls back to the sequential parser,
//! which reports the precise syntax error.

use core::ops::Range;

use crate::simd::{scalar, Backend, Structural, StructuralClass};

/// Chunk size for the structural scan; bounds the scratch vector.
const SCAN_CHUNK: usize = 4096;

/// Indexing failed; the input needs the sequential parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IndexError {
    pub offset: usize,
}

/// Byte spans of an array's top-level elements.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ArrayBounds {
    /// Whitespace-trimmed span of each element, in document order.
    pub elements: Vec<Range<usize>>,
    /// Offset one past the closing `]`.
    pub end: usize,
}

/// Byte spans of an object's top-level members.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ObjectBounds {
    /// `(key, value)` spans in document order. Key spans include the
    /// surrounding quotes; value spans are whitespace-trimmed.
    pub members: Vec<(Range<usize>, Range<usize>)>,
    /// Offset one past the closing `}`.
    pub end: usize,
}

/// Streams structural events chunk by chunk, resolving string state and
/// escapes, and tracking bracket depth relative to the container being
/// indexed.
struct Scanner<'a> {
    buf: &'a [u8],
    backend: &'static Backend,
    events: Vec<Structural>,
    next_event: usize,
    chunk_end: usize,
    in_string: bool,
    escaped_pos: Option<usize>,
    /// Depth relative to the container: 1 inside it, 0 after its close.
    depth: usize,
}

/// A structural event that survived string/escape filtering.
enum Event {
    /// Comma at container depth.
    Comma(usize),
    /// Colon at container depth.
    Colon(usize),
    /// The container's own closing bracket.
    Close(usize),
    /// A quote toggling string state (position of the quote).
    QuoteOpen(usize),
    QuoteClose(usize),
}

impl<'a> Scanner<'a> {
    fn new(buf: &'a [u8], start: usize, backend: &'static Backend) -> Self {
        Scanner {
            buf,
            backend,
            events: Vec::new(),
            next_event: 0,
            chunk_end: start,
            in_string: false,
            escaped_pos: None,
            depth: 1,
        }
    }

    fn fill(&mut self) -> bool {
        while self.next_event >= self.events.len() {
            if self.chunk_end >= self.buf.len() {
                return false;
            }
            let start = self.chunk_end;
            self.chunk_end = (start + SCAN_CHUNK).min(self.buf.len());
            self.events.clear();
            self.next_event = 0;
            (self.backend.find_structural_chars)(self.buf, start, self.chunk_end, &mut self.events);
        }
        true
    }

    /// Next event relevant to the container's own level, or `None` at end
    /// of input. Events inside strings, escaped characters, and brackets
    /// below the container level are filtered out here.
    fn next(&mut self) -> Option<Event> {
        loop {
            if !self.fill() {
                return None;
            }
            let (pos, class) = self.events[self.next_event];
            self.next_event += 1;

            if self.escaped_pos == Some(pos) {
                self.escaped_pos = None;
                continue;
            }
            self.escaped_pos = None;

            if self.in_string {
                match class {
                    StructuralClass::Quote => {
                        self.in_string = false;
                        return Some(Event::QuoteClose(pos));
                    }
                    StructuralClass::Backslash => {
                        self.escaped_pos = Some(pos + 1);
                    }
                    _ => {}
                }
                continue;
            }

            match class {
                StructuralClass::Quote => {
                    self.in_string = true;
                    return Some(Event::QuoteOpen(pos));
                }
                StructuralClass::Backslash => {
                    // Backslash outside a string; the value parser will
                    // report the syntax error.
                }
                StructuralClass::ObjectOpen | StructuralClass::ArrayOpen => {
                    self.depth += 1;
                }
                StructuralClass::ObjectClose | StructuralClass::ArrayClose => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        return Some(Event::Close(pos));
                    }
                }
                StructuralClass::Comma => {
                    if self.depth == 1 {
                        return Some(Event::Comma(pos));
                    }
                }
                StructuralClass::Colon => {
                    if self.depth == 1 {
                        return Some(Event::Colon(pos));
                    }
                }
            }
        }
    }
}

fn trim(buf: &[u8], mut range: Range<usize>) -> Range<usize> {
    while range.start < range.end && scalar::is_whitespace(buf[range.start]) {
        range.start += 1;
    }
    while range.end > range.start && scalar::is_whitespace(buf[range.end - 1]) {
        range.end -= 1;
    }
    range
}

/// Index the top-level elements of the array whose `[` sits at `open`.
pub(crate) fn index_array(
    buf: &[u8],
    open: usize,
    backend: &'static Backend,
) -> Result<ArrayBounds, IndexError> {
    debug_assert_eq!(buf.get(open), Some(&b'['));
    let mut scanner = Scanner::new(buf, open + 1, backend);
    let mut elements = Vec::new();
    let mut element_start = open + 1;

    loop {
        match scanner.next() {
            Some(Event::Comma(pos)) => {
                let span = trim(buf, element_start..pos);
                if span.is_empty() {
                    return Err(IndexError { offset: pos });
                }
                elements.push(span);
                element_start = pos + 1;
            }
            Some(Event::Close(pos)) => {
                // A `}` balancing the opening `[` is a syntax error.
                if buf[pos] != b']' {
                    return Err(IndexError { offset: pos });
                }
                let span = trim(buf, element_start..pos);
                if span.is_empty() {
                    // Only legal for `[]`; `[1,]` has a dangling comma.
                    if !elements.is_empty() {
                        return Err(IndexError { offset: pos });
                    }
                } else {
                    elements.push(span);
                }
                return Ok(ArrayBounds {
                    elements,
                    end: pos + 1,
                });
            }
            Some(Event::Colon(pos)) => return Err(IndexError { offset: pos }),
            Some(Event::QuoteOpen(_)) | Some(Event::QuoteClose(_)) => {}
            None => return Err(IndexError { offset: buf.len() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberState {
    NeedKey,
    InKey { key_start: usize },
    NeedColon,
    NeedValue,
}

/// Index the top-level members of the object whose `{` sits at `open`.
pub(crate) fn index_object(
    buf: &[u8],
    open: usize,
    backend: &'static Backend,
) -> Result<ObjectBounds, IndexError> {
    debug_assert_eq!(buf.get(open), Some(&b'{'));
    let mut scanner = Scanner::new(buf, open + 1, backend);
    let mut members: Vec<(Range<usize>, Range<usize>)> = Vec::new();
    let mut state = MemberState::NeedKey;
    let mut key_span = 0..0;
    let mut value_start = 0;
    // Offset just past `{` or the last member's comma.
    let mut member_start = open + 1;

    loop {
        let event = match scanner.next() {
            Some(event) => event,
            None => return Err(IndexError { offset: buf.len() }),
        };
        match state {
            MemberState::NeedKey => match event {
                Event::QuoteOpen(pos) => {
                    // The key must be the first token after `{` or `,`.
                    let before = trim(buf, member_start..pos);
                    if !before.is_empty() {
                        return Err(IndexError {
                            offset: before.start,
                        });
                    }
                    state = MemberState::InKey { key_start: pos };
                }
                Event::Close(pos) => {
                    // A `]` balancing the opening `{` is a syntax error.
                    if buf[pos] != b'}' || !members.is_empty() {
                        return Err(IndexError { offset: pos });
                    }
                    let inside = trim(buf, open + 1..pos);
                    if !inside.is_empty() {
                        return Err(IndexError {
                            offset: inside.start,
                        });
                    }
                    return Ok(ObjectBounds {
                        members,
                        end: pos + 1,
                    });
                }
                Event::Comma(pos) | Event::Colon(pos) => {
                    return Err(IndexError { offset: pos })
                }
                Event::QuoteClose(_) => unreachable!("close without open"),
            },
            MemberState::InKey { key_start } => match event {
                Event::QuoteClose(pos) => {
                    key_span = key_start..pos + 1;
                    state = MemberState::NeedColon;
                }
                _ => unreachable!("string state filters everything else"),
            },
            MemberState::NeedColon => match event {
                Event::Colon(pos) => {
                    let between = trim(buf, key_span.end..pos);
                    if !between.is_empty() {
                        return Err(IndexError {
                            offset: between.start,
                        });
                    }
                    value_start = pos + 1;
                    state = MemberState::NeedValue;
                }
                Event::Comma(pos) | Event::Close(pos) | Event::QuoteOpen(pos) => {
                    return Err(IndexError { offset: pos })
                }
                Event::QuoteClose(_) => unreachable!("not in string"),
            },
            MemberState::NeedValue => match event {
                Event::Comma(pos) => {
                    let span = trim(buf, value_start..pos);
                    if span.is_empty() {
                        return Err(IndexError { offset: pos });
                    }
                    members.push((key_span.clone(), span));
                    member_start = pos + 1;
                    state = MemberState::NeedKey;
                }
                Event::Close(pos) => {
                    if buf[pos] != b'}' {
                        return Err(IndexError { offset: pos });
                    }
                    let span = trim(buf, value_start..pos);
                    if span.is_empty() {
                        return Err(IndexError { offset: pos });
                    }
                    members.push((key_span.clone(), span));
                    return Ok(ObjectBounds {
                        members,
                        end: pos + 1,
                    });
                }
                Event::Colon(pos) => return Err(IndexError { offset: pos }),
                // String values pass through; nested containers and their
                // contents never reach this level.
                Event::QuoteOpen(_) | Event::QuoteClose(_) => {}
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd::SCALAR;

    fn spans(bounds: &ArrayBounds, buf: &[u8]) -> Vec<String> {
        bounds
            .elements
            .iter()
            .map(|r| String::from_utf8_lossy(&buf[r.clone()]).into_owned())
            .collect()
    }

    #[test]
    fn array_elements_are_trimmed_spans() {
        let buf = b"[ 1 , \"a,b\" , [2,3] , {\"k\": 4} ]";
        let bounds = index_array(buf, 0, &SCALAR).unwrap();
        assert_eq!(spans(&bounds, buf), ["1", "\"a,b\"", "[2,3]", "{\"k\": 4}"]);
        assert_eq!(bounds.end, buf.len());
    }

    #[test]
    fn empty_array() {
        let bounds = index_array(b"[   ]", 0, &SCALAR).unwrap();
        assert!(bounds.elements.is_empty());
        assert_eq!(bounds.end, 5);
    }

    #[test]
    fn escaped_quote_does_not_end_string() {
        let buf = br#"["a\"b,c", 2]"#;
        let bounds = index_array(buf, 0, &SCALAR).unwrap();
        assert_eq!(spans(&bounds, buf), [r#""a\"b,c""#, "2"]);
    }

    #[test]
    fn double_backslash_ends_escape() {
        let buf = br#"["a\\", 2]"#;
        let bounds = index_array(buf, 0, &SCALAR).unwrap();
        assert_eq!(spans(&bounds, buf), [r#""a\\""#, "2"]);
    }

    #[test]
    fn dangling_comma_is_an_index_error() {
        assert!(index_array(b"[1,2,]", 0, &SCALAR).is_err());
        assert!(index_array(b"[1,,2]", 0, &SCALAR).is_err());
    }

    #[test]
    fn mismatched_close_bracket_is_an_index_error() {
        assert_eq!(
            index_array(b"[1, 2, 3}", 0, &SCALAR),
            Err(IndexError { offset: 8 })
        );
        assert_eq!(
            index_object(b"{\"a\": 1, \"b\": 2]", 0, &SCALAR),
            Err(IndexError { offset: 15 })
        );
        assert!(index_object(b"{]", 0, &SCALAR).is_err());
        // A mismatch below the container level stays inside the span.
        let bounds = index_array(b"[[1}, 2]", 0, &SCALAR).unwrap();
        assert_eq!(&b"[[1}, 2]"[bounds.elements[0].clone()], b"[1}");
    }

    #[test]
    fn unterminated_array_is_an_index_error() {
        assert_eq!(
            index_array(b"[1, 2", 0, &SCALAR),
            Err(IndexError { offset: 5 })
        );
        assert!(index_array(b"[\"unclosed", 0, &SCALAR).is_err());
    }

    #[test]
    fn object_members_pair_keys_and_values() {
        let buf = br#"{ "a": 1, "b": [1, 2], "c": {"x": "}"} }"#;
        let bounds = index_object(buf, 0, &SCALAR).unwrap();
        let got: Vec<(String, String)> = bounds
            .members
            .iter()
            .map(|(k, v)| {
                (
                    String::from_utf8_lossy(&buf[k.clone()]).into_owned(),
                    String::from_utf8_lossy(&buf[v.clone()]).into_owned(),
                )
            })
            .collect();
        assert_eq!(
            got,
            [
                ("\"a\"".to_string(), "1".to_string()),
                ("\"b\"".to_string(), "[1, 2]".to_string()),
                ("\"c\"".to_string(), "{\"x\": \"}\"}".to_string()),
            ]
        );
        assert_eq!(bounds.end, buf.len());
    }

    #[test]
    fn empty_object() {
        let bounds = index_object(b"{  }", 0, &SCALAR).unwrap();
        assert!(bounds.members.is_empty());
        assert_eq!(bounds.end, 4);
    }

    #[test]
    fn object_irregularities_are_index_errors() {
        assert!(index_object(b"{\"a\" 1}", 0, &SCALAR).is_err()); // missing colon
        assert!(index_object(b"{\"a\": 1,}", 0, &SCALAR).is_err()); // trailing comma
        assert!(index_object(b"{\"a\": }", 0, &SCALAR).is_err()); // missing value
        assert!(index_object(b"{1: 2}", 0, &SCALAR).is_err()); // non-string key
        assert!(index_object(b"{\"a\": 1", 0, &SCALAR).is_err()); // unterminated
    }

    #[test]
    fn spans_cross_scan_chunks() {
        // Force the scanner across multiple 4096-byte chunks.
        let big = "x".repeat(3 * SCAN_CHUNK);
        let doc = format!("[\"{big}\", 1]");
        let buf = doc.as_bytes();
        let bounds = index_array(buf, 0, &SCALAR).unwrap();
        assert_eq!(bounds.elements.len(), 2);
        assert_eq!(&buf[bounds.elements[1].clone()], b"1");
    }
}
