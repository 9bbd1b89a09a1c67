//! Literal values for dynamic queries.
//!
//! This module provides [`Value`], the tagged literal type flowing through
//! predicate inputs, and its SQL quoting rules. Quoting is exhaustive over
//! the variants, so every value reaching the renderer has a defined
//! representation.

use serde_json::Number;

/// A literal value usable in a query predicate.
///
/// # Example
/// ```ignore
/// use clickquery::Value;
///
/// Value::from(123).quote();        // 123
/// Value::from("a'bc").quote();     // 'a\'bc'
/// Value::from(true).quote();       // 1
/// Value::Null.quote();             // NULL
/// Value::from(vec![1, 2]).quote(); // (1,2)
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Boolean, rendered as `1` / `0`
    Bool(bool),
    /// Integer or float, rendered unquoted
    Number(Number),
    /// String, rendered single-quoted with embedded quotes escaped
    Text(String),
    /// Ordered sequence, rendered parenthesized and comma-joined
    Sequence(Vec<Value>),
}

impl Value {
    /// Whether this value is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Render this value as a quoted SQL literal.
    ///
    /// - `Null` renders `NULL`
    /// - `Bool` renders `1` / `0`
    /// - `Number` renders unquoted
    /// - `Text` renders single-quoted, embedded `'` escaped as `\'`
    /// - `Sequence` renders `(v1,v2,...)` with each element quoted recursively
    pub fn quote(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Text(s) => quote_str(s),
            Value::Sequence(items) => {
                let parts: Vec<String> = items.iter().map(Value::quote).collect();
                format!("({})", parts.join(","))
            }
        }
    }
}

/// Single-quote a string literal, escaping embedded quotes as `\'`.
pub(crate) fn quote_str(s: &str) -> String {
    format!("'{}'", s.replace('\'', "\\'"))
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(Number::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(Number::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Number(Number::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Number(Number::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        // Non-finite floats have no SQL literal form.
        Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            // Objects have no literal form; render as their JSON text.
            other => Value::Text(other.to_string()),
        }
    }
}
