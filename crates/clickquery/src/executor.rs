//! Executor capability consumed by the connection layer.
//!
//! An [`Executor`] is the adapter boundary: it resolves a named connection
//! in the host application and runs raw SQL against it. The core treats it
//! as opaque and never assumes a particular driver.

use crate::error::ExecutorError;
use async_trait::async_trait;

/// One result row: a column-name to JSON-value mapping.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Capability to execute raw SQL against the backing database.
///
/// Implementations are chosen explicitly by the caller at connection
/// construction time; the core performs no adapter auto-detection.
/// Executors are assumed safe for concurrent use by multiple builder
/// instances.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute a SQL statement and return the result rows.
    async fn execute(&self, sql: &str) -> Result<Vec<Row>, ExecutorError>;

    /// Parameters of the current request, if the host framework has one.
    ///
    /// Used only by the pagination convenience path to source `page` /
    /// `pageSize` / `is_export` when no explicit parameters are supplied.
    fn request_parameters(&self) -> Row {
        Row::new()
    }
}

/// Read a row field as an unsigned integer, accepting numeric strings.
pub(crate) fn field_as_u64(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Read a row field as a signed integer, accepting numeric strings.
///
/// Unreadable values count as zero, matching the lenient summation
/// semantics of `count()`.
pub(crate) fn field_as_i64(value: &serde_json::Value) -> i64 {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<i64>()
            .ok()
            .or_else(|| s.trim().parse::<f64>().ok().map(|f| f as i64))
            .unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_coercion_accepts_numbers_and_numeric_strings() {
        assert_eq!(field_as_u64(&json!(7)), Some(7));
        assert_eq!(field_as_u64(&json!("12")), Some(12));
        assert_eq!(field_as_u64(&json!("x")), None);

        assert_eq!(field_as_i64(&json!(-3)), -3);
        assert_eq!(field_as_i64(&json!("41")), 41);
        assert_eq!(field_as_i64(&json!("2.9")), 2);
        assert_eq!(field_as_i64(&json!(null)), 0);
    }
}
