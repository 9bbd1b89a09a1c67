//! Query condition compilation for dynamic WHERE/HAVING clauses.
//!
//! This module provides [`ConditionBuilder`], which turns declarative
//! predicate inputs (equality pairs, `field / operator / value` triples,
//! raw fragments) into quoted SQL boolean fragments and merges the
//! accumulated AND/OR groups into a single clause with correct
//! parenthesization.

use crate::error::{QueryError, QueryResult};
use crate::value::Value;

/// Logical group a condition belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogicalOp {
    /// All conditions in the group must hold
    #[default]
    And,
    /// Any condition in the group may hold
    Or,
}

/// Operators accepted by the triple form, after lowercase normalization.
const SUPPORTED_OPERATORS: &[&str] = &[
    "=", ">", "<", ">=", "<=", "!=", "<>", "in", "not in", "between", "like",
];

/// Accumulates rendered condition fragments in AND/OR groups.
///
/// Fragments are compiled eagerly, so malformed input fails at the call
/// site rather than at render time. Blank fragments are filtered before
/// merging.
#[derive(Debug, Clone, Default)]
pub struct ConditionBuilder {
    and: Vec<String>,
    or: Vec<String>,
}

impl ConditionBuilder {
    /// Create an empty condition builder.
    pub fn new() -> Self {
        Self::default()
    }

    fn group_mut(&mut self, group: LogicalOp) -> &mut Vec<String> {
        match group {
            LogicalOp::And => &mut self.and,
            LogicalOp::Or => &mut self.or,
        }
    }

    /// Add an equality condition: `` `field` = value ``
    pub fn push_eq(
        &mut self,
        field: &str,
        value: impl Into<Value>,
        group: LogicalOp,
    ) -> QueryResult<()> {
        let fragment = compile_eq(field, &value.into())?;
        self.group_mut(group).push(fragment);
        Ok(())
    }

    /// Add a `field / operator / value` condition.
    ///
    /// The operator is lowercased and validated against the supported set;
    /// `in` / `not in` / `between` apply their own value-shape rules.
    pub fn push_cmp(
        &mut self,
        field: &str,
        operator: &str,
        value: impl Into<Value>,
        group: LogicalOp,
    ) -> QueryResult<()> {
        let fragment = compile_cmp(field, operator, &value.into())?;
        self.group_mut(group).push(fragment);
        Ok(())
    }

    /// Add `` `field` IS NULL `` to the AND group.
    pub fn push_null(&mut self, field: &str) -> QueryResult<()> {
        validate_field(field)?;
        self.and.push(format!("`{field}` IS NULL"));
        Ok(())
    }

    /// Add `` `field` IS NOT NULL `` to the AND group.
    pub fn push_not_null(&mut self, field: &str) -> QueryResult<()> {
        validate_field(field)?;
        self.and.push(format!("`{field}` IS NOT NULL"));
        Ok(())
    }

    /// Add `` `field` IN (...) `` to the AND group.
    pub fn push_in(&mut self, field: &str, values: Vec<Value>) -> QueryResult<()> {
        validate_field(field)?;
        self.and
            .push(format!("`{}` IN ({})", field, format_in_values(&values)?));
        Ok(())
    }

    /// Add `` `field` NOT IN (...) `` to the AND group.
    pub fn push_not_in(&mut self, field: &str, values: Vec<Value>) -> QueryResult<()> {
        validate_field(field)?;
        self.and
            .push(format!("`{}` NOT IN ({})", field, format_in_values(&values)?));
        Ok(())
    }

    /// Add `` `field` BETWEEN low AND high `` to the AND group.
    ///
    /// Both bounds must be non-null.
    pub fn push_between(
        &mut self,
        field: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> QueryResult<()> {
        let fragment = compile_between(field, &low.into(), &high.into())?;
        self.and.push(fragment);
        Ok(())
    }

    /// Add a raw SQL fragment to the AND group.
    ///
    /// Each `?` placeholder is substituted, in order, by one quoted literal
    /// from `values`; the fragment is parenthesized before insertion.
    ///
    /// # Safety
    /// The fragment is concatenated into the statement as-is. The caller
    /// must ensure it is trusted SQL.
    pub fn push_raw(&mut self, fragment: &str, values: &[Value]) {
        let mut rendered = fragment.to_string();
        for value in values {
            match rendered.find('?') {
                Some(pos) => rendered.replace_range(pos..pos + 1, &value.quote()),
                None => break,
            }
        }
        self.and.push(format!("({rendered})"));
    }

    /// Add an already-rendered fragment to the chosen group.
    pub(crate) fn push_fragment(&mut self, fragment: String, group: LogicalOp) {
        self.group_mut(group).push(fragment);
    }

    /// Whether no conditions have been added.
    pub fn is_empty(&self) -> bool {
        self.and.is_empty() && self.or.is_empty()
    }

    /// Remove all conditions.
    pub fn clear(&mut self) {
        self.and.clear();
        self.or.clear();
    }

    /// Merge the AND and OR groups into one rendered clause.
    ///
    /// - only AND conditions: joined with `AND`, no wrapping
    /// - only OR conditions: parenthesized and joined with `OR` when more
    ///   than one, bare otherwise
    /// - both: each side parenthesized when it has more than one member,
    ///   the two sides joined with `OR`, the union wrapped —
    ///   `(ANDpart OR ORpart)`
    ///
    /// The OR-combination of the two groups is the established contract for
    /// callers of this builder and is preserved exactly; see DESIGN.md.
    pub fn merge(&self) -> Option<String> {
        let and: Vec<&String> = self.and.iter().filter(|c| !c.trim().is_empty()).collect();
        let or: Vec<&String> = self.or.iter().filter(|c| !c.trim().is_empty()).collect();

        match (and.is_empty(), or.is_empty()) {
            (false, true) => Some(join(&and, " AND ")),
            (true, false) => {
                if or.len() > 1 {
                    Some(format!("({})", join(&or, " OR ")))
                } else {
                    Some(or[0].clone())
                }
            }
            (false, false) => {
                let and_part = if and.len() > 1 {
                    format!("({})", join(&and, " AND "))
                } else {
                    and[0].clone()
                };
                let or_part = if or.len() > 1 {
                    format!("({})", join(&or, " OR "))
                } else {
                    or[0].clone()
                };
                Some(format!("({and_part} OR {or_part})"))
            }
            (true, true) => None,
        }
    }
}

fn join(parts: &[&String], sep: &str) -> String {
    parts
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Compile an equality condition: `` `field` = value ``
pub(crate) fn compile_eq(field: &str, value: &Value) -> QueryResult<String> {
    validate_field(field)?;
    Ok(format!("`{}` = {}", field, value.quote()))
}

/// Compile a `field / operator / value` condition.
pub(crate) fn compile_cmp(field: &str, operator: &str, value: &Value) -> QueryResult<String> {
    validate_field(field)?;

    if operator.trim().is_empty() {
        return Err(QueryError::InvalidOperator(
            "operator must be a non-empty string".to_string(),
        ));
    }

    let operator = operator.to_lowercase();
    if !SUPPORTED_OPERATORS.contains(&operator.as_str()) {
        return Err(QueryError::UnsupportedOperator(operator));
    }

    if operator == "in" || operator == "not in" {
        let items = match value {
            Value::Sequence(items) => items,
            _ => {
                return Err(QueryError::invalid_value(
                    "IN / NOT IN requires a sequence value",
                ));
            }
        };
        return Ok(format!(
            "`{}` {} ({})",
            field,
            operator.to_uppercase(),
            format_in_values(items)?
        ));
    }

    if operator == "between" {
        let (low, high) = match value {
            Value::Sequence(items) if items.len() == 2 => (&items[0], &items[1]),
            _ => {
                return Err(QueryError::invalid_value(
                    "BETWEEN requires a two-element sequence",
                ));
            }
        };
        return compile_between(field, low, high);
    }

    if value.is_null() {
        return Err(QueryError::NullValueRejected(format!(
            "`{field}` {operator} NULL; use an explicit null predicate instead"
        )));
    }

    // Comparison operators keep the normalized lowercase spelling.
    Ok(format!("`{}` {} {}", field, operator, value.quote()))
}

/// Compile `` `field` BETWEEN low AND high ``, rejecting null bounds.
pub(crate) fn compile_between(field: &str, low: &Value, high: &Value) -> QueryResult<String> {
    validate_field(field)?;
    if low.is_null() || high.is_null() {
        return Err(QueryError::invalid_value("BETWEEN bounds must not be NULL"));
    }
    Ok(format!(
        "`{}` BETWEEN {} AND {}",
        field,
        low.quote(),
        high.quote()
    ))
}

/// Render the element list of an IN / NOT IN condition.
///
/// Numbers render unquoted; text renders as an escaped string literal.
/// The sequence must be non-empty and must not contain NULL or nested
/// sequences.
pub(crate) fn format_in_values(values: &[Value]) -> QueryResult<String> {
    if values.is_empty() {
        return Err(QueryError::invalid_value(
            "IN / NOT IN requires a non-empty sequence",
        ));
    }

    let mut parts = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::Null => {
                return Err(QueryError::invalid_value(
                    "IN / NOT IN elements must not be NULL",
                ));
            }
            Value::Sequence(_) => {
                return Err(QueryError::invalid_value(
                    "IN / NOT IN elements must be scalar",
                ));
            }
            other => parts.push(other.quote()),
        }
    }
    Ok(parts.join(","))
}

pub(crate) fn validate_field(field: &str) -> QueryResult<()> {
    if field.trim().is_empty() {
        return Err(QueryError::InvalidFieldName(
            "field name must be a non-empty string".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_renders_backticked_and_quoted() {
        let mut cb = ConditionBuilder::new();
        cb.push_eq("status", "ok", LogicalOp::And).unwrap();
        assert_eq!(cb.merge().unwrap(), "`status` = 'ok'");
    }

    #[test]
    fn and_conditions_join_without_wrapping() {
        let mut cb = ConditionBuilder::new();
        cb.push_eq("a", 1, LogicalOp::And).unwrap();
        cb.push_eq("b", 2, LogicalOp::And).unwrap();
        assert_eq!(cb.merge().unwrap(), "`a` = 1 AND `b` = 2");
    }

    #[test]
    fn single_or_condition_renders_bare() {
        let mut cb = ConditionBuilder::new();
        cb.push_eq("a", 1, LogicalOp::Or).unwrap();
        assert_eq!(cb.merge().unwrap(), "`a` = 1");
    }

    #[test]
    fn multiple_or_conditions_render_parenthesized() {
        let mut cb = ConditionBuilder::new();
        cb.push_eq("a", 1, LogicalOp::Or).unwrap();
        cb.push_eq("b", 2, LogicalOp::Or).unwrap();
        assert_eq!(cb.merge().unwrap(), "(`a` = 1 OR `b` = 2)");
    }

    #[test]
    fn mixed_groups_join_with_or() {
        let mut cb = ConditionBuilder::new();
        cb.push_eq("a", 1, LogicalOp::And).unwrap();
        cb.push_eq("b", 2, LogicalOp::And).unwrap();
        cb.push_eq("c", 3, LogicalOp::Or).unwrap();
        assert_eq!(cb.merge().unwrap(), "((`a` = 1 AND `b` = 2) OR `c` = 3)");
    }

    #[test]
    fn mixed_single_members_skip_inner_parens() {
        let mut cb = ConditionBuilder::new();
        cb.push_eq("a", 1, LogicalOp::And).unwrap();
        cb.push_eq("b", 2, LogicalOp::Or).unwrap();
        assert_eq!(cb.merge().unwrap(), "(`a` = 1 OR `b` = 2)");
    }

    #[test]
    fn empty_builder_merges_to_none() {
        assert_eq!(ConditionBuilder::new().merge(), None);
    }

    #[test]
    fn cmp_normalizes_operator_case() {
        let sql = compile_cmp("age", ">=", &Value::from(18)).unwrap();
        assert_eq!(sql, "`age` >= 18");
        let sql = compile_cmp("name", "LIKE", &Value::from("%x%")).unwrap();
        assert_eq!(sql, "`name` like '%x%'");
    }

    #[test]
    fn cmp_rejects_unsupported_operator() {
        let err = compile_cmp("name", "regexp", &Value::from("x")).unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedOperator(_)));
    }

    #[test]
    fn cmp_rejects_empty_operator_and_field() {
        let err = compile_cmp("name", "  ", &Value::from("x")).unwrap_err();
        assert!(matches!(err, QueryError::InvalidOperator(_)));
        let err = compile_cmp("", "=", &Value::from("x")).unwrap_err();
        assert!(matches!(err, QueryError::InvalidFieldName(_)));
    }

    #[test]
    fn cmp_rejects_null_for_plain_operators() {
        let err = compile_cmp("name", "=", &Value::Null).unwrap_err();
        assert!(matches!(err, QueryError::NullValueRejected(_)));
    }

    #[test]
    fn in_renders_numbers_unquoted_and_text_quoted() {
        let sql = compile_cmp("x", "in", &Value::from(vec![1, 2, 3])).unwrap();
        assert_eq!(sql, "`x` IN (1,2,3)");
        let sql = compile_cmp("x", "not in", &Value::from(vec!["a", "b"])).unwrap();
        assert_eq!(sql, "`x` NOT IN ('a','b')");
    }

    #[test]
    fn in_rejects_empty_and_non_sequence_values() {
        let err = compile_cmp("x", "in", &Value::Sequence(vec![])).unwrap_err();
        assert!(matches!(err, QueryError::InvalidConditionValue(_)));
        let err = compile_cmp("x", "in", &Value::from(1)).unwrap_err();
        assert!(matches!(err, QueryError::InvalidConditionValue(_)));
    }

    #[test]
    fn between_requires_two_non_null_bounds() {
        let sql = compile_cmp("age", "between", &Value::from(vec![18, 65])).unwrap();
        assert_eq!(sql, "`age` BETWEEN 18 AND 65");

        let err = compile_cmp(
            "age",
            "between",
            &Value::Sequence(vec![Value::Null, Value::from(65)]),
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::InvalidConditionValue(_)));

        let err = compile_cmp("age", "between", &Value::from(vec![18])).unwrap_err();
        assert!(matches!(err, QueryError::InvalidConditionValue(_)));
    }

    #[test]
    fn raw_substitutes_placeholders_in_order() {
        let mut cb = ConditionBuilder::new();
        cb.push_raw(
            "a = ? OR b = ?",
            &[Value::from(1), Value::from("x'y")],
        );
        assert_eq!(cb.merge().unwrap(), r"(a = 1 OR b = 'x\'y')");
    }

    #[test]
    fn raw_ignores_surplus_values() {
        let mut cb = ConditionBuilder::new();
        cb.push_raw("a = ?", &[Value::from(1), Value::from(2)]);
        assert_eq!(cb.merge().unwrap(), "(a = 1)");
    }
}
