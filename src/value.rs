//! The parsed document tree.
//!
//! [`Value`] owns its children. Objects preserve insertion order through
//! [`IndexMap`], so re-serializing a document keeps its member order and a
//! duplicate key keeps its first position while taking the last value.
//!
//! Dropping, cloning, and comparing a `Value` never recurse: all three walk
//! the tree with an explicit stack, so a document that parsed within the
//! configured depth limit can always be freed, copied, and compared, and
//! trees assembled manually far beyond that limit can too.

use indexmap::IndexMap;

use crate::error::ParseError;

/// A JSON value.
#[derive(Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    /// All numbers are kept as `f64`, matching the grammar's single number
    /// type.
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    /// The variant name, as used in [`TypeMismatch`](crate::ErrorCode::TypeMismatch)
    /// messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// The boolean payload, or `TypeMismatch`.
    pub fn as_bool(&self) -> Result<bool, ParseError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(ParseError::type_mismatch("bool", other.type_name())),
        }
    }

    /// The numeric payload, or `TypeMismatch`.
    pub fn as_number(&self) -> Result<f64, ParseError> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(ParseError::type_mismatch("number", other.type_name())),
        }
    }

    /// The string payload, or `TypeMismatch`.
    pub fn as_str(&self) -> Result<&str, ParseError> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(ParseError::type_mismatch("string", other.type_name())),
        }
    }

    /// The element list, or `TypeMismatch`.
    pub fn as_array(&self) -> Result<&[Value], ParseError> {
        match self {
            Value::Array(items) => Ok(items),
            other => Err(ParseError::type_mismatch("array", other.type_name())),
        }
    }

    /// The member map, or `TypeMismatch`.
    pub fn as_object(&self) -> Result<&IndexMap<String, Value>, ParseError> {
        match self {
            Value::Object(map) => Ok(map),
            other => Err(ParseError::type_mismatch("object", other.type_name())),
        }
    }

    /// Member lookup by key; `None` for missing keys and non-objects.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Element lookup by index; `None` out of range and for non-arrays.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        match self {
            Value::Array(items) => items.get(index),
            _ => None,
        }
    }

    /// Number of elements or members; 0 for scalars.
    pub fn len(&self) -> usize {
        match self {
            Value::Array(items) => items.len(),
            Value::Object(map) => map.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append to an array value.
    pub fn push(&mut self, value: Value) -> Result<(), ParseError> {
        match self {
            Value::Array(items) => {
                items.push(value);
                Ok(())
            }
            other => Err(ParseError::type_mismatch("array", other.type_name())),
        }
    }

    /// Insert into an object value. An existing key keeps its position and
    /// takes the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Result<(), ParseError> {
        match self {
            Value::Object(map) => {
                map.insert(key.into(), value);
                Ok(())
            }
            other => Err(ParseError::type_mismatch("object", other.type_name())),
        }
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        // Scalars and empty containers drop trivially; only a populated
        // container starts the iterative teardown.
        match self {
            Value::Array(items) if !items.is_empty() => {}
            Value::Object(map) if !map.is_empty() => {}
            _ => return,
        }
        let mut stack = vec![core::mem::take(self)];
        while let Some(mut value) = stack.pop() {
            match &mut value {
                Value::Array(items) => stack.append(items),
                Value::Object(map) => stack.extend(map.drain(..).map(|(_, child)| child)),
                _ => {}
            }
            // `value` is now childless and drops without recursing.
        }
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        let mut builder = TreeBuilder::default();
        walk(self, &mut builder);
        builder.finish()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        let mut pairs = vec![(self, other)];
        while let Some((a, b)) = pairs.pop() {
            match (a, b) {
                (Value::Null, Value::Null) => {}
                (Value::Bool(x), Value::Bool(y)) if x == y => {}
                (Value::Number(x), Value::Number(y)) if x == y => {}
                (Value::String(x), Value::String(y)) if x == y => {}
                (Value::Array(x), Value::Array(y)) if x.len() == y.len() => {
                    pairs.extend(x.iter().zip(y));
                }
                (Value::Object(x), Value::Object(y)) if x.len() == y.len() => {
                    // Member order is not part of object equality.
                    for (key, vx) in x {
                        match y.get(key) {
                            Some(vy) => pairs.push((vx, vy)),
                            None => return false,
                        }
                    }
                }
                _ => return false,
            }
        }
        true
    }
}

/// Rebuilds a tree from [`walk`] callbacks; backs the iterative [`Clone`].
#[derive(Default)]
struct TreeBuilder {
    root: Option<Value>,
    stack: Vec<BuildFrame>,
}

enum BuildFrame {
    Array(Vec<Value>),
    Object(IndexMap<String, Value>, Option<String>),
}

impl TreeBuilder {
    fn attach(&mut self, value: Value) {
        match self.stack.last_mut() {
            Some(BuildFrame::Array(items)) => items.push(value),
            Some(BuildFrame::Object(map, key)) => {
                if let Some(key) = key.take() {
                    map.insert(key, value);
                }
            }
            None => self.root = Some(value),
        }
    }

    fn finish(self) -> Value {
        self.root.unwrap_or(Value::Null)
    }
}

impl Visit for TreeBuilder {
    fn visit_null(&mut self) {
        self.attach(Value::Null);
    }

    fn visit_bool(&mut self, value: bool) {
        self.attach(Value::Bool(value));
    }

    fn visit_number(&mut self, value: f64) {
        self.attach(Value::Number(value));
    }

    fn visit_string(&mut self, value: &str) {
        self.attach(Value::String(value.to_string()));
    }

    fn visit_array_start(&mut self, len: usize) {
        self.stack.push(BuildFrame::Array(Vec::with_capacity(len)));
    }

    fn visit_array_end(&mut self) {
        if let Some(BuildFrame::Array(items)) = self.stack.pop() {
            self.attach(Value::Array(items));
        }
    }

    fn visit_object_start(&mut self, len: usize) {
        self.stack
            .push(BuildFrame::Object(IndexMap::with_capacity(len), None));
    }

    fn visit_key(&mut self, key: &str) {
        if let Some(BuildFrame::Object(_, slot)) = self.stack.last_mut() {
            *slot = Some(key.to_string());
        }
    }

    fn visit_object_end(&mut self) {
        if let Some(BuildFrame::Object(map, _)) = self.stack.pop() {
            self.attach(Value::Object(map));
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Depth-first visitor over a [`Value`] tree.
///
/// All callbacks default to no-ops so a visitor only implements what it
/// needs. [`walk`] drives the traversal without recursion.
pub trait Visit {
    fn visit_null(&mut self) {}
    fn visit_bool(&mut self, _value: bool) {}
    fn visit_number(&mut self, _value: f64) {}
    fn visit_string(&mut self, _value: &str) {}
    fn visit_array_start(&mut self, _len: usize) {}
    fn visit_array_end(&mut self) {}
    fn visit_object_start(&mut self, _len: usize) {}
    /// Called before the member's value callbacks.
    fn visit_key(&mut self, _key: &str) {}
    fn visit_object_end(&mut self) {}
}

enum WalkFrame<'a> {
    Value(&'a Value),
    Key(&'a str),
    ArrayEnd,
    ObjectEnd,
}

/// Drive `visitor` over `value` in document order, iteratively.
pub fn walk<V: Visit>(value: &Value, visitor: &mut V) {
    let mut stack = vec![WalkFrame::Value(value)];
    while let Some(frame) = stack.pop() {
        match frame {
            WalkFrame::Value(value) => match value {
                Value::Null => visitor.visit_null(),
                Value::Bool(b) => visitor.visit_bool(*b),
                Value::Number(n) => visitor.visit_number(*n),
                Value::String(s) => visitor.visit_string(s),
                Value::Array(items) => {
                    visitor.visit_array_start(items.len());
                    stack.push(WalkFrame::ArrayEnd);
                    for item in items.iter().rev() {
                        stack.push(WalkFrame::Value(item));
                    }
                }
                Value::Object(map) => {
                    visitor.visit_object_start(map.len());
                    stack.push(WalkFrame::ObjectEnd);
                    for (key, child) in map.iter().rev() {
                        stack.push(WalkFrame::Value(child));
                        stack.push(WalkFrame::Key(key));
                    }
                }
            },
            WalkFrame::Key(key) => visitor.visit_key(key),
            WalkFrame::ArrayEnd => visitor.visit_array_end(),
            WalkFrame::ObjectEnd => visitor.visit_object_end(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;

    fn deep_array(depth: usize) -> Value {
        let mut value = Value::Array(vec![Value::Number(1.0)]);
        for _ in 0..depth {
            value = Value::Array(vec![value]);
        }
        value
    }

    #[test]
    fn drop_survives_very_deep_trees() {
        // Deep enough that recursive teardown would blow the stack.
        let value = deep_array(500_000);
        drop(value);
    }

    #[test]
    fn clone_and_eq_survive_very_deep_trees() {
        let value = deep_array(500_000);
        let copy = value.clone();
        // assert! rather than assert_eq!: the failure formatter recurses.
        assert!(copy == value);

        let mut other = deep_array(500_000);
        other.push(Value::Null).unwrap();
        assert!(other != value);
    }

    #[test]
    fn clone_copies_every_variant() {
        let mut object = Value::Object(IndexMap::new());
        object.insert("n", Value::Null).unwrap();
        object.insert("b", Value::Bool(true)).unwrap();
        object.insert("x", Value::from(1.5)).unwrap();
        object.insert("s", Value::from("text")).unwrap();
        object
            .insert("a", Value::Array(vec![Value::from(2.0)]))
            .unwrap();
        let copy = object.clone();
        assert_eq!(copy, object);
        let keys: Vec<&String> = copy.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["n", "b", "x", "s", "a"]);
    }

    #[test]
    fn object_equality_ignores_member_order() {
        let mut ab = Value::Object(IndexMap::new());
        ab.insert("a", Value::from(1.0)).unwrap();
        ab.insert("b", Value::from(2.0)).unwrap();
        let mut ba = Value::Object(IndexMap::new());
        ba.insert("b", Value::from(2.0)).unwrap();
        ba.insert("a", Value::from(1.0)).unwrap();
        assert_eq!(ab, ba);

        let mut ac = Value::Object(IndexMap::new());
        ac.insert("a", Value::from(1.0)).unwrap();
        ac.insert("c", Value::from(2.0)).unwrap();
        assert_ne!(ab, ac);
    }

    #[test]
    fn accessors_check_variants() {
        let value = Value::String("hi".to_string());
        assert_eq!(value.as_str().unwrap(), "hi");
        let err = value.as_number().unwrap_err();
        assert_eq!(err.code, ErrorCode::TypeMismatch);
        assert_eq!(err.message, "expected number, found string");
    }

    #[test]
    fn builder_mutation() {
        let mut array = Value::Array(Vec::new());
        array.push(Value::Bool(true)).unwrap();
        array.push(Value::from(2.0)).unwrap();
        assert_eq!(array.len(), 2);
        assert!(Value::Null.push(Value::Null).is_err());

        let mut object = Value::Object(IndexMap::new());
        object.insert("a", Value::from(1.0)).unwrap();
        object.insert("b", Value::from(2.0)).unwrap();
        object.insert("a", Value::from(3.0)).unwrap();
        // Replaced key keeps its original position.
        let keys: Vec<&String> = object.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(object.get("a").unwrap().as_number().unwrap(), 3.0);
    }

    #[test]
    fn walk_visits_in_document_order() {
        #[derive(Default)]
        struct Trace(Vec<String>);
        impl Visit for Trace {
            fn visit_number(&mut self, value: f64) {
                self.0.push(format!("n{value}"));
            }
            fn visit_key(&mut self, key: &str) {
                self.0.push(format!("k{key}"));
            }
            fn visit_array_start(&mut self, _len: usize) {
                self.0.push("[".to_string());
            }
            fn visit_array_end(&mut self) {
                self.0.push("]".to_string());
            }
            fn visit_object_start(&mut self, _len: usize) {
                self.0.push("{".to_string());
            }
            fn visit_object_end(&mut self) {
                self.0.push("}".to_string());
            }
        }

        let mut object = Value::Object(IndexMap::new());
        object.insert("a", Value::from(1.0)).unwrap();
        object
            .insert(
                "b",
                Value::Array(vec![Value::from(2.0), Value::from(3.0)]),
            )
            .unwrap();

        let mut trace = Trace::default();
        walk(&object, &mut trace);
        assert_eq!(trace.0, ["{", "ka", "n1", "kb", "[", "n2", "n3", "]", "}"]);
    }
}
