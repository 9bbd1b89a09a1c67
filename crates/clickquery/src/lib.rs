//! # clickquery
//!
//! SQL construction and admission-controlled execution for ClickHouse.
//!
//! ## Features
//!
//! - **Fluent query building**: compose filtered, grouped, ordered,
//!   paginated SELECT statements without hand-writing SQL
//! - **Composable conditions**: AND/OR groups, nested groups, raw
//!   fragments, all with safe value quoting
//! - **WITH subqueries**: precompute a subquery once and select from its
//!   alias
//! - **Admission control**: poll the server's own process table and wait
//!   with randomized backoff while the database is saturated
//! - **Global predicates**: a connection-scoped equality conjunction
//!   merged into every top-level WHERE unless suppressed
//!
//! ## Usage
//!
//! ```ignore
//! use clickquery::{Connection, ConnectionConfig, QueryBuilder};
//! use std::sync::Arc;
//!
//! let connection = Connection::new(
//!     Arc::new(MyExecutor::new("clickhouse")),
//!     ConnectionConfig::new().with_global_condition("game_id", 1),
//! )?;
//!
//! let mut qb = QueryBuilder::new("events", connection);
//! let rows = qb
//!     .select(["id", "name"])
//!     .where_eq("status", "ok")?
//!     .order_by("created_at", "desc")
//!     .limit(50)
//!     .get(true)
//!     .await?;
//! ```

pub mod admission;
pub mod builder;
pub mod condition;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod value;

pub use admission::AdmissionController;
pub use builder::{ClauseBuilder, Page, PageParams, Paginated, QueryBuilder};
pub use condition::{ConditionBuilder, LogicalOp};
pub use config::{ConnectionConfig, ConnectionPolicy};
pub use connection::Connection;
pub use error::{ExecutorError, QueryError, QueryResult};
pub use executor::{Executor, Row};
pub use value::Value;

#[cfg(test)]
pub(crate) mod test_util;
