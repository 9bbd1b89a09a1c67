//! Per-query clause state and SQL rendering.

use crate::condition::ConditionBuilder;

/// Owns the mutable clause state of one query and renders each clause
/// independently.
///
/// Rendering is deterministic for identical state; clause composition
/// order is fixed: `WITH, SELECT, FROM, WHERE, GROUP BY, HAVING,
/// ORDER BY, LIMIT`, with empty clauses omitted entirely.
#[derive(Debug, Clone)]
pub struct ClauseBuilder {
    /// SELECT projections (empty renders `*`)
    pub(crate) fields: Vec<String>,
    /// GROUP BY column list
    pub(crate) group_by: Vec<String>,
    /// HAVING fragments, AND-joined
    pub(crate) having: Vec<String>,
    /// ORDER BY entries, already rendered as `` `col` DIR ``
    pub(crate) order_by: Vec<String>,
    /// LIMIT (0 means unbounded)
    pub(crate) limit: u64,
    /// OFFSET (rendered only alongside LIMIT)
    pub(crate) offset: u64,
    /// FROM override (empty uses the builder's bound table)
    pub(crate) from: String,
    /// WITH subqueries as (alias, rendered SQL), in insertion order
    pub(crate) with: Vec<(String, String)>,
    /// Whether the connection's global predicates join the WHERE clause
    pub(crate) use_global_conditions: bool,
    /// Accumulated WHERE condition tree
    pub(crate) conditions: ConditionBuilder,
}

impl Default for ClauseBuilder {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: 0,
            offset: 0,
            from: String::new(),
            with: Vec::new(),
            use_global_conditions: true,
            conditions: ConditionBuilder::new(),
        }
    }
}

impl ClauseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the full statement for `table`, merging `global_where` into
    /// the WHERE clause per the suppression rules.
    pub fn render(&self, table: &str, global_where: &str) -> String {
        let parts = [
            self.build_with(),
            self.build_select(),
            self.build_from(table),
            self.build_where(global_where),
            self.build_group_by(),
            self.build_having(),
            self.build_order_by(),
            self.build_limit(),
        ];

        parts
            .iter()
            .filter(|part| !part.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn build_with(&self) -> String {
        if self.with.is_empty() {
            return String::new();
        }
        let clauses: Vec<String> = self
            .with
            .iter()
            .map(|(alias, sql)| format!("{alias} AS ({sql})"))
            .collect();
        format!("WITH {}", clauses.join(", "))
    }

    fn build_select(&self) -> String {
        if self.fields.is_empty() {
            "SELECT *".to_string()
        } else {
            format!("SELECT {}", self.fields.join(", "))
        }
    }

    fn build_from(&self, table: &str) -> String {
        let target = if self.from.is_empty() {
            table
        } else {
            self.from.as_str()
        };
        format!("FROM {target}")
    }

    /// WHERE merges, in order: the connection's global conjunction (unless
    /// suppressed or this query defines WITH subqueries), then the merged
    /// AND/OR condition tree.
    fn build_where(&self, global_where: &str) -> String {
        let mut conditions = Vec::new();

        if self.use_global_conditions && self.with.is_empty() && !global_where.is_empty() {
            conditions.push(global_where.to_string());
        }
        if let Some(merged) = self.conditions.merge() {
            conditions.push(merged);
        }

        if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        }
    }

    fn build_group_by(&self) -> String {
        if self.group_by.is_empty() {
            String::new()
        } else {
            format!("GROUP BY {}", self.group_by.join(", "))
        }
    }

    fn build_having(&self) -> String {
        if self.having.is_empty() {
            String::new()
        } else {
            format!("HAVING {}", self.having.join(" AND "))
        }
    }

    fn build_order_by(&self) -> String {
        if self.order_by.is_empty() {
            String::new()
        } else {
            format!("ORDER BY {}", self.order_by.join(", "))
        }
    }

    fn build_limit(&self) -> String {
        if self.limit == 0 {
            return String::new();
        }
        let mut sql = format!("LIMIT {}", self.limit);
        if self.offset > 0 {
            sql.push_str(&format!(" OFFSET {}", self.offset));
        }
        sql
    }

    /// Restore the zero value so the owning builder can be reused.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
