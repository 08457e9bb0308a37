//! Parallel decomposition of large top-level containers.
//!
//! A big root array or object is split by the boundary indexer into
//! independent byte spans, which scoped worker threads claim through a
//! shared atomic counter. Each worker writes into a positional result slot,
//! so assembly order is the document order regardless of which thread
//! finished first, and the reported error is always the earliest one by
//! document position. Workers parse with the same backend and config as the
//! sequential path and start at depth 1 (inside the container), so depth
//! limits and error offsets come out identical.
//!
//! Decomposition is only attempted at the document root; nested containers
//! inside a span are parsed sequentially by the worker that owns the span.

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

use indexmap::IndexMap;

use crate::error::{ErrorCode, ParseError};
use crate::index::{index_array, index_object};
use crate::parser::Parser;
use crate::simd::Backend;
use crate::value::Value;
use crate::ParseConfig;

/// Parse the container whose opening bracket sits at `open`, splitting its
/// top-level members across threads.
///
/// Returns `Ok(None)` when the input is better served by the sequential
/// parser: indexing failed (malformed input gets its precise error there),
/// or there is too little work to split.
pub(crate) fn parse_container(
    input: &[u8],
    open: usize,
    backend: &'static Backend,
    config: &ParseConfig,
) -> Result<Option<(Value, usize)>, ParseError> {
    // The container itself occupies one depth level.
    if config.max_depth == 0 {
        return Ok(None);
    }
    match input[open] {
        b'[' => parse_array(input, open, backend, config),
        b'{' => parse_object(input, open, backend, config),
        _ => Ok(None),
    }
}

fn parse_array(
    input: &[u8],
    open: usize,
    backend: &'static Backend,
    config: &ParseConfig,
) -> Result<Option<(Value, usize)>, ParseError> {
    let bounds = match index_array(input, open, backend) {
        Ok(bounds) => bounds,
        Err(_) => return Ok(None),
    };
    if bounds.elements.len() < 2 {
        return Ok(None);
    }

    let results = run_tasks(&bounds.elements, config, |range| {
        parse_span(input, range, backend, config, "expected ',' or ']'")
    });

    let mut items = Vec::with_capacity(results.len());
    for result in results {
        items.push(result?);
    }
    Ok(Some((Value::Array(items), bounds.end)))
}

fn parse_object(
    input: &[u8],
    open: usize,
    backend: &'static Backend,
    config: &ParseConfig,
) -> Result<Option<(Value, usize)>, ParseError> {
    let bounds = match index_object(input, open, backend) {
        Ok(bounds) => bounds,
        Err(_) => return Ok(None),
    };
    if bounds.members.len() < 2 {
        return Ok(None);
    }

    let results = run_tasks(&bounds.members, config, |(key_range, value_range)| {
        let key = parse_key(input, key_range, backend, config)?;
        let value = parse_span(input, value_range, backend, config, "expected ',' or '}'")?;
        Ok((key, value))
    });

    // Insertion in slot order keeps duplicate-key resolution identical to
    // the sequential parser: first position, last value.
    let mut map = IndexMap::with_capacity(results.len());
    for result in results {
        let (key, value) = result?;
        map.insert(key, value);
    }
    Ok(Some((Value::Object(map), bounds.end)))
}

/// Fan `tasks` out over scoped worker threads, collecting one result per
/// task in task order.
fn run_tasks<T, R, F>(tasks: &[T], config: &ParseConfig, work: F) -> Vec<Result<R, ParseError>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R, ParseError> + Sync,
{
    let workers = config.thread_count.min(tasks.len()).max(1);
    let next = AtomicUsize::new(0);
    let slots: Mutex<Vec<Option<Result<R, ParseError>>>> =
        Mutex::new((0..tasks.len()).map(|_| None).collect());

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                if index >= tasks.len() {
                    break;
                }
                let result = work(&tasks[index]);
                let mut guard = match slots.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                guard[index] = Some(result);
            });
        }
    });

    let slots = match slots.into_inner() {
        Ok(slots) => slots,
        Err(poisoned) => poisoned.into_inner(),
    };
    slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| {
                Err(ParseError::new(
                    ErrorCode::InvalidSyntax,
                    "worker task produced no result",
                    0,
                ))
            })
        })
        .collect()
}

/// Parse one member span as a complete value; leftover bytes in the span
/// get the same error the sequential parser raises at its separator check.
fn parse_span(
    input: &[u8],
    range: &Range<usize>,
    backend: &'static Backend,
    config: &ParseConfig,
    trailing_message: &'static str,
) -> Result<Value, ParseError> {
    let mut parser = Parser::new(&input[range.clone()], range.start, 1, backend, config);
    let value = parser.parse_value()?;
    if !parser.skip_trailing_whitespace() {
        return Err(ParseError::new(
            ErrorCode::InvalidSyntax,
            trailing_message,
            range.start + parser.position(),
        ));
    }
    Ok(value)
}

/// Decode an object key span (quotes included) into its string value.
fn parse_key(
    input: &[u8],
    range: &Range<usize>,
    backend: &'static Backend,
    config: &ParseConfig,
) -> Result<String, ParseError> {
    let mut parser = Parser::new(&input[range.clone()], range.start, 1, backend, config);
    parser.parse_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd::SCALAR;

    fn config(threads: usize) -> ParseConfig {
        ParseConfig::default().with_thread_count(threads)
    }

    fn run(input: &[u8], threads: usize) -> Result<Option<(Value, usize)>, ParseError> {
        let config = config(threads);
        let open = (SCALAR.skip_whitespace)(input, 0);
        parse_container(input, open, &SCALAR, &config)
    }

    fn sequential(input: &[u8]) -> Result<Value, ParseError> {
        let config = ParseConfig::default();
        Parser::new(input, 0, 0, &SCALAR, &config).parse_document()
    }

    #[test]
    fn array_matches_sequential() {
        let doc = format!(
            "[{}]",
            (0..200)
                .map(|i| format!("{{\"i\": {i}, \"s\": \"v{i}\"}}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        for threads in [1, 2, 4, 8] {
            let (value, end) = run(doc.as_bytes(), threads).unwrap().unwrap();
            assert_eq!(end, doc.len());
            assert_eq!(value, sequential(doc.as_bytes()).unwrap());
        }
    }

    #[test]
    fn object_matches_sequential() {
        let doc = format!(
            "{{{}}}",
            (0..100)
                .map(|i| format!("\"k{i}\": [{i}, {}]", i * 2))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let (value, _) = run(doc.as_bytes(), 4).unwrap().unwrap();
        assert_eq!(value, sequential(doc.as_bytes()).unwrap());
    }

    #[test]
    fn earliest_error_wins() {
        // Two bad elements; the one earlier in the document must be the
        // error reported, regardless of completion order.
        let doc = b"[1, 01, 2, 02, 3]";
        let err = run(doc, 4).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidNumber);
        assert_eq!(err.offset, 4);
        let seq_err = sequential(doc).unwrap_err();
        assert_eq!((err.code, err.offset), (seq_err.code, seq_err.offset));
    }

    #[test]
    fn malformed_input_falls_back() {
        // Dangling comma defeats the indexer; sequential owns the error.
        assert_eq!(run(b"[1, 2,]", 4).unwrap(), None);
        assert_eq!(run(b"[1, 2", 4).unwrap(), None);
        assert_eq!(run(b"{\"a\" 1, \"b\": 2}", 4).unwrap(), None);
    }

    #[test]
    fn mismatched_close_bracket_falls_back() {
        // `}` closing a `[` (and vice versa) must never assemble a value;
        // the sequential parser reports the syntax error.
        assert_eq!(run(b"[1, 2, 3}", 4).unwrap(), None);
        assert_eq!(run(b"{\"a\": 1, \"b\": 2]", 4).unwrap(), None);
        for doc in [&b"[1, 2, 3}"[..], b"{\"a\": 1, \"b\": 2]"] {
            let err = sequential(doc).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidSyntax);
        }
    }

    #[test]
    fn small_containers_fall_back() {
        assert_eq!(run(b"[]", 4).unwrap(), None);
        assert_eq!(run(b"[1]", 4).unwrap(), None);
        assert_eq!(run(b"{\"only\": 1}", 4).unwrap(), None);
    }

    #[test]
    fn duplicate_keys_resolve_in_document_order() {
        let doc = br#"{"k": 1, "x": 2, "k": 3}"#;
        let (value, _) = run(doc, 4).unwrap().unwrap();
        assert_eq!(value, sequential(doc).unwrap());
        assert_eq!(value.get("k").unwrap().as_number().unwrap(), 3.0);
    }

    #[test]
    fn worker_depth_matches_sequential() {
        // Each element nests 3 levels; with the container that is depth 4.
        let doc = b"[[[[1]]], [[[2]]]]";
        let deep_enough = ParseConfig::default().with_thread_count(2).with_max_depth(4);
        assert!(parse_container(doc, 0, &SCALAR, &deep_enough).is_ok());
        let too_shallow = ParseConfig::default().with_thread_count(2).with_max_depth(3);
        let err = parse_container(doc, 0, &SCALAR, &too_shallow).unwrap_err();
        assert_eq!(err.code, ErrorCode::StackOverflow);
        let seq_err = Parser::new(doc, 0, 0, &SCALAR, &too_shallow)
            .parse_document()
            .unwrap_err();
        assert_eq!((err.code, err.offset), (seq_err.code, seq_err.offset));
    }
}
