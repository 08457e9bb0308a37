//! Compact JSON output.
//!
//! The serializer is a [`Visit`] implementation driven by the iterative
//! [`walk`], so it handles trees of any depth without recursing. Output is
//! minimal: no whitespace, members in stored order, strings escaped with
//! the short forms where one exists and `\u00XX` for the remaining control
//! characters.

use crate::value::{walk, Value, Visit};

/// Serialize `value` to a compact JSON string.
pub fn to_json_string(value: &Value) -> String {
    let mut ser = Serializer::default();
    walk(value, &mut ser);
    ser.out
}

#[derive(Clone, Copy)]
enum Ctx {
    Array { first: bool },
    Object { first: bool },
}

#[derive(Default)]
struct Serializer {
    out: String,
    stack: Vec<Ctx>,
}

impl Serializer {
    /// Emit the separator owed before a value. Object members get theirs
    /// before the key instead.
    fn before_value(&mut self) {
        if let Some(Ctx::Array { first }) = self.stack.last_mut() {
            if *first {
                *first = false;
            } else {
                self.out.push(',');
            }
        }
    }

    fn push_escaped(&mut self, s: &str) {
        self.out.push('"');
        for c in s.chars() {
            match c {
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                '\u{8}' => self.out.push_str("\\b"),
                '\u{c}' => self.out.push_str("\\f"),
                c if (c as u32) < 0x20 => {
                    self.out.push_str("\\u00");
                    let b = c as u32;
                    for shift in [4, 0] {
                        let digit = (b >> shift) & 0xF;
                        self.out.push(char::from_digit(digit, 16).unwrap_or('0'));
                    }
                }
                c => self.out.push(c),
            }
        }
        self.out.push('"');
    }
}

impl Visit for Serializer {
    fn visit_null(&mut self) {
        self.before_value();
        self.out.push_str("null");
    }

    fn visit_bool(&mut self, value: bool) {
        self.before_value();
        self.out.push_str(if value { "true" } else { "false" });
    }

    fn visit_number(&mut self, value: f64) {
        self.before_value();
        if value.is_finite() {
            self.out.push_str(&value.to_string());
        } else {
            // Infinities and NaN have no JSON spelling; only buildable by
            // hand, never produced by the parser.
            self.out.push_str("null");
        }
    }

    fn visit_string(&mut self, value: &str) {
        self.before_value();
        self.push_escaped(value);
    }

    fn visit_array_start(&mut self, _len: usize) {
        self.before_value();
        self.out.push('[');
        self.stack.push(Ctx::Array { first: true });
    }

    fn visit_array_end(&mut self) {
        self.out.push(']');
        self.stack.pop();
    }

    fn visit_object_start(&mut self, _len: usize) {
        self.before_value();
        self.out.push('{');
        self.stack.push(Ctx::Object { first: true });
    }

    fn visit_key(&mut self, key: &str) {
        if let Some(Ctx::Object { first }) = self.stack.last_mut() {
            if *first {
                *first = false;
            } else {
                self.out.push(',');
            }
        }
        self.push_escaped(key);
        self.out.push(':');
    }

    fn visit_object_end(&mut self) {
        self.out.push('}');
        self.stack.pop();
    }
}
