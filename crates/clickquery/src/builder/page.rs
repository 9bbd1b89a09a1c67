//! Pagination types.

use crate::executor::{Row, field_as_u64};
use serde::Serialize;
use serde_json::Value as Json;

/// One page of results plus pagination bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub total: i64,
    pub per_page: u64,
    pub current_page: u64,
    pub last_page: u64,
    pub data: Vec<Row>,
}

/// Result of a paginate call.
///
/// Export mode returns the full unpaginated row set; otherwise one page
/// with its envelope. Serializes untagged, so exports stay a plain array.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Paginated {
    /// All matching rows (export mode)
    Export(Vec<Row>),
    /// One page with totals
    Page(Page),
}

/// Parsed pagination inputs.
#[derive(Debug, Clone)]
pub struct PageParams {
    /// 1-based page number
    pub page: u64,
    /// Rows per page
    pub page_size: u64,
    /// Export mode: return everything, ignore page/page_size
    pub is_export: bool,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            is_export: false,
        }
    }
}

impl PageParams {
    /// Create parameters, clamping both values to at least 1.
    pub fn new(page: u64, page_size: u64) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
            is_export: false,
        }
    }

    /// Mark these parameters as an export request.
    pub fn export() -> Self {
        Self {
            is_export: true,
            ..Self::default()
        }
    }

    /// Extract `page` / `pageSize` / `is_export` from a request-parameter
    /// mapping, applying defaults and clamping. Numeric strings are
    /// accepted for the counters.
    pub fn from_request(params: &Row) -> Self {
        let page = params
            .get("page")
            .and_then(field_as_u64)
            .unwrap_or(1)
            .max(1);
        let page_size = params
            .get("pageSize")
            .and_then(field_as_u64)
            .unwrap_or(10)
            .max(1);
        let is_export = params.get("is_export").is_some_and(truthy);

        Self {
            page,
            page_size,
            is_export,
        }
    }
}

/// Loose truthiness for request parameters: `false`, `0`, `"0"`, `""` and
/// null are false, everything else true.
fn truthy(value: &Json) -> bool {
    match value {
        Json::Bool(b) => *b,
        Json::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Json::String(s) => !s.is_empty() && s != "0",
        Json::Null => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::row;

    #[test]
    fn defaults_apply_when_keys_are_missing() {
        let params = PageParams::from_request(&Row::new());
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, 10);
        assert!(!params.is_export);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let params = PageParams::from_request(&row(&[
            ("page", "3".into()),
            ("pageSize", "25".into()),
        ]));
        assert_eq!(params.page, 3);
        assert_eq!(params.page_size, 25);
    }

    #[test]
    fn zero_page_clamps_to_one() {
        let params = PageParams::from_request(&row(&[("page", 0.into()), ("pageSize", 0.into())]));
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, 1);
    }

    #[test]
    fn export_flag_uses_loose_truthiness() {
        for (value, expected) in [
            (serde_json::json!(true), true),
            (serde_json::json!(1), true),
            (serde_json::json!("1"), true),
            (serde_json::json!("0"), false),
            (serde_json::json!(""), false),
            (serde_json::json!(0), false),
            (serde_json::json!(null), false),
        ] {
            let params = PageParams::from_request(&row(&[("is_export", value.clone())]));
            assert_eq!(params.is_export, expected, "value: {value}");
        }
    }
}
