//! SELECT query builder façade.
//!
//! [`QueryBuilder`] composes the clause state, the condition compiler and
//! a connection handle into full statements: fluent clause-setting calls
//! mutate the builder in place, and a terminal call (`get`, `first`,
//! `count`, `paginate`, `to_sql`) renders the accumulated state.
//!
//! A builder is exclusively owned by its caller; concurrent callers must
//! use independent instances. Terminal executing calls reset the clause
//! state so the same instance can be reused for the next query.

use crate::builder::clause::ClauseBuilder;
use crate::builder::page::{Page, PageParams, Paginated};
use crate::condition::{self, ConditionBuilder, LogicalOp};
use crate::connection::Connection;
use crate::error::QueryResult;
use crate::executor::{Row, field_as_i64};
use crate::value::Value;

/// Fluent query builder bound to one table and one connection.
#[derive(Clone, Debug)]
pub struct QueryBuilder {
    table: String,
    clauses: ClauseBuilder,
    connection: Connection,
}

impl QueryBuilder {
    /// Create a builder bound to a table and a connection.
    pub fn new(table: impl Into<String>, connection: Connection) -> Self {
        Self {
            table: table.into(),
            clauses: ClauseBuilder::new(),
            connection,
        }
    }

    /// The bound table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The bound connection handle.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    // ==================== Projection, grouping, ordering ====================

    /// Set the SELECT projections. Expressions are rendered verbatim.
    pub fn select<I>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.clauses.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Set the GROUP BY column list.
    pub fn group_by<I>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.clauses.group_by = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Add one ORDER BY entry; the direction is uppercased.
    pub fn order_by(&mut self, column: &str, direction: &str) -> &mut Self {
        self.clauses
            .order_by
            .push(format!("`{}` {}", column, direction.to_uppercase()));
        self
    }

    /// Add ORDER BY entries from `(column, direction)` pairs.
    pub fn order_by_map<I, C, D>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (C, D)>,
        C: Into<String>,
        D: AsRef<str>,
    {
        for (column, direction) in pairs {
            let column: String = column.into();
            self.clauses
                .order_by
                .push(format!("`{}` {}", column, direction.as_ref().to_uppercase()));
        }
        self
    }

    /// Set LIMIT; 0 leaves the query unbounded.
    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.clauses.limit = limit;
        self
    }

    /// Set OFFSET; rendered only alongside a positive LIMIT.
    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.clauses.offset = offset;
        self
    }

    /// Override the FROM target (e.g. to select from a WITH alias).
    pub fn from(&mut self, table: &str) -> &mut Self {
        self.clauses.from = table.to_string();
        self
    }

    /// Add a HAVING equality condition.
    pub fn having_eq(&mut self, field: &str, value: impl Into<Value>) -> QueryResult<&mut Self> {
        let fragment = condition::compile_eq(field, &value.into())?;
        self.clauses.having.push(fragment);
        Ok(self)
    }

    /// Add a HAVING `field / operator / value` condition.
    pub fn having_cmp(
        &mut self,
        field: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> QueryResult<&mut Self> {
        let fragment = condition::compile_cmp(field, operator, &value.into())?;
        self.clauses.having.push(fragment);
        Ok(self)
    }

    // ==================== WHERE conditions ====================

    /// Add an AND equality condition.
    pub fn where_eq(&mut self, field: &str, value: impl Into<Value>) -> QueryResult<&mut Self> {
        self.clauses
            .conditions
            .push_eq(field, value, LogicalOp::And)?;
        Ok(self)
    }

    /// Add AND equality conditions from `(field, value)` pairs.
    pub fn where_map<I, F, V>(&mut self, pairs: I) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<String>,
        V: Into<Value>,
    {
        for (field, value) in pairs {
            let field: String = field.into();
            self.clauses
                .conditions
                .push_eq(&field, value, LogicalOp::And)?;
        }
        Ok(self)
    }

    /// Add an AND `field / operator / value` condition.
    pub fn where_cmp(
        &mut self,
        field: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> QueryResult<&mut Self> {
        self.clauses
            .conditions
            .push_cmp(field, operator, value, LogicalOp::And)?;
        Ok(self)
    }

    /// Add an OR equality condition.
    pub fn or_where_eq(&mut self, field: &str, value: impl Into<Value>) -> QueryResult<&mut Self> {
        self.clauses
            .conditions
            .push_eq(field, value, LogicalOp::Or)?;
        Ok(self)
    }

    /// Add OR equality conditions from `(field, value)` pairs.
    pub fn or_where_map<I, F, V>(&mut self, pairs: I) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<String>,
        V: Into<Value>,
    {
        for (field, value) in pairs {
            let field: String = field.into();
            self.clauses
                .conditions
                .push_eq(&field, value, LogicalOp::Or)?;
        }
        Ok(self)
    }

    /// Add an OR `field / operator / value` condition.
    pub fn or_where_cmp(
        &mut self,
        field: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> QueryResult<&mut Self> {
        self.clauses
            .conditions
            .push_cmp(field, operator, value, LogicalOp::Or)?;
        Ok(self)
    }

    /// Add `` `field` IS NULL ``.
    pub fn where_null(&mut self, field: &str) -> QueryResult<&mut Self> {
        self.clauses.conditions.push_null(field)?;
        Ok(self)
    }

    /// Add `` `field` IS NOT NULL ``.
    pub fn where_not_null(&mut self, field: &str) -> QueryResult<&mut Self> {
        self.clauses.conditions.push_not_null(field)?;
        Ok(self)
    }

    /// Add `` `field` IN (...) ``. The value list must be non-empty.
    pub fn where_in<V: Into<Value>>(
        &mut self,
        field: &str,
        values: Vec<V>,
    ) -> QueryResult<&mut Self> {
        self.clauses
            .conditions
            .push_in(field, values.into_iter().map(Into::into).collect())?;
        Ok(self)
    }

    /// Add `` `field` NOT IN (...) ``. The value list must be non-empty.
    pub fn where_not_in<V: Into<Value>>(
        &mut self,
        field: &str,
        values: Vec<V>,
    ) -> QueryResult<&mut Self> {
        self.clauses
            .conditions
            .push_not_in(field, values.into_iter().map(Into::into).collect())?;
        Ok(self)
    }

    /// Add `` `field` BETWEEN low AND high ``.
    pub fn where_between(
        &mut self,
        field: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> QueryResult<&mut Self> {
        self.clauses.conditions.push_between(field, low, high)?;
        Ok(self)
    }

    /// Add a raw WHERE fragment with positional `?` placeholders.
    ///
    /// # Safety
    /// The fragment is concatenated as-is; the caller must ensure it is
    /// trusted SQL.
    pub fn where_raw<V: Into<Value>>(&mut self, fragment: &str, values: Vec<V>) -> &mut Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.clauses.conditions.push_raw(fragment, &values);
        self
    }

    /// Build an isolated condition sub-tree and append it, as one
    /// parenthesized fragment, to the chosen outer group.
    pub fn where_group<F>(&mut self, group: LogicalOp, f: F) -> QueryResult<&mut Self>
    where
        F: FnOnce(&mut ConditionBuilder) -> QueryResult<()>,
    {
        let mut nested = ConditionBuilder::new();
        f(&mut nested)?;
        if let Some(merged) = nested.merge() {
            self.clauses
                .conditions
                .push_fragment(format!("({merged})"), group);
        }
        Ok(self)
    }

    /// Apply `f` only when `value` is present.
    ///
    /// ```ignore
    /// qb.when(filter.status, |qb, status| {
    ///     qb.where_eq("status", status)?;
    ///     Ok(())
    /// })?;
    /// ```
    pub fn when<T, F>(&mut self, value: Option<T>, f: F) -> QueryResult<&mut Self>
    where
        F: FnOnce(&mut Self, T) -> QueryResult<()>,
    {
        if let Some(value) = value {
            f(self, value)?;
        }
        Ok(self)
    }

    // ==================== Subqueries & global predicates ====================

    /// Register a WITH subquery under `alias`.
    ///
    /// The callback receives an independent builder bound to the same
    /// table and connection; its rendered SQL is stored and the alias can
    /// then be targeted via [`QueryBuilder::from`].
    pub fn with<F>(&mut self, alias: &str, f: F) -> QueryResult<&mut Self>
    where
        F: FnOnce(&mut QueryBuilder) -> QueryResult<()>,
    {
        let mut subquery = QueryBuilder::new(self.table.clone(), self.connection.clone());
        f(&mut subquery)?;
        let sql = subquery.to_sql();
        self.clauses.with.push((alias.to_string(), sql));
        Ok(self)
    }

    /// Exclude the connection's global predicates from this query.
    pub fn without_global_conditions(&mut self) -> &mut Self {
        self.clauses.use_global_conditions = false;
        self
    }

    /// Re-include the connection's global predicates (the default).
    pub fn with_global_conditions(&mut self) -> &mut Self {
        self.clauses.use_global_conditions = true;
        self
    }

    // ==================== Terminal operations ====================

    /// Render the statement for the current state.
    ///
    /// Pure: no execution, no reset; identical state renders identical
    /// SQL.
    pub fn to_sql(&self) -> String {
        self.clauses.render(&self.table, self.connection.global_where())
    }

    /// Execute the query and return all rows, then reset the builder for
    /// reuse.
    pub async fn get(&mut self, use_admission_control: bool) -> QueryResult<Vec<Row>> {
        let sql = self.to_sql();
        let rows = self.connection.execute(&sql, use_admission_control).await?;
        self.clauses.reset();
        Ok(rows)
    }

    /// Execute the query and return only the first row, if any.
    ///
    /// The full query still runs unchanged; no LIMIT is injected. Callers
    /// wanting a cheap single-row probe should set `limit(1)` themselves.
    pub async fn first(&mut self, use_admission_control: bool) -> QueryResult<Option<Row>> {
        let rows = self.get(use_admission_control).await?;
        Ok(rows.into_iter().next())
    }

    /// Execute a COUNT over the current predicate state.
    ///
    /// Swaps the projections for a single count expression (`count()`
    /// when `column` is empty) and drops the ordering for the call, then
    /// restores both so a subsequent page fetch keeps its shape. Returns
    /// the summed `count` column across returned rows, or 0 when absent.
    pub async fn count(&mut self, column: &str, use_admission_control: bool) -> QueryResult<i64> {
        let original_fields = std::mem::take(&mut self.clauses.fields);
        let original_order = std::mem::take(&mut self.clauses.order_by);

        self.clauses.fields = vec![if column.is_empty() {
            "count() as count".to_string()
        } else {
            format!("count({column}) as count")
        }];

        let result = self.get(use_admission_control).await;

        self.clauses.fields = original_fields;
        self.clauses.order_by = original_order;

        Ok(sum_count_column(&result?))
    }

    /// Execute a raw SQL statement over the bound connection.
    pub async fn execute(&self, sql: &str, use_admission_control: bool) -> QueryResult<Vec<Row>> {
        self.connection.execute(sql, use_admission_control).await
    }

    /// Fetch one page of results.
    ///
    /// With no explicit `params`, pagination inputs are sourced from the
    /// executor's request parameters. Export mode returns the full
    /// unpaginated row set. The total is computed either by wrapping the
    /// current predicate/grouping state (minus ordering) as a WITH
    /// subquery aliased `allData` and counting from that alias, or by
    /// cloning this builder and counting directly; both paths yield the
    /// same total for the same predicate state.
    pub async fn paginate(
        &mut self,
        params: Option<PageParams>,
        use_subquery_count: bool,
        count_field: &str,
        use_admission_control: bool,
    ) -> QueryResult<Paginated> {
        let params = params
            .unwrap_or_else(|| PageParams::from_request(&self.connection.request_parameters()));

        if params.is_export {
            return Ok(Paginated::Export(self.get(use_admission_control).await?));
        }

        let total = if use_subquery_count {
            // Count from a precomputed subquery so the (possibly
            // expensive) ORDER BY never runs for the total.
            let mut inner = self.clauses.clone();
            inner.order_by.clear();
            let subquery_sql = inner.render(&self.table, self.connection.global_where());

            let mut count_query = QueryBuilder::new(self.table.clone(), self.connection.clone());
            count_query
                .clauses
                .with
                .push(("allData".to_string(), subquery_sql));
            count_query.from("allData");
            count_query.count(count_field, use_admission_control).await?
        } else {
            let mut count_query = self.clone();
            count_query.count(count_field, use_admission_control).await?
        };

        self.limit(params.page_size);
        self.offset((params.page - 1) * params.page_size);
        let data = self.get(use_admission_control).await?;

        let last_page = if total > 0 {
            (total as u64).div_ceil(params.page_size)
        } else {
            1
        };

        Ok(Paginated::Page(Page {
            total,
            per_page: params.page_size,
            current_page: params.page,
            last_page,
            data,
        }))
    }
}

fn sum_count_column(rows: &[Row]) -> i64 {
    match rows.first() {
        Some(first) if first.contains_key("count") => rows
            .iter()
            .filter_map(|row| row.get("count"))
            .map(field_as_i64)
            .sum(),
        _ => 0,
    }
}
