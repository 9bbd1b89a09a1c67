//! Connection layer: executor handle, global predicates, admission routing.

use crate::admission::AdmissionController;
use crate::condition::compile_eq;
use crate::config::{ConnectionConfig, ConnectionPolicy};
use crate::error::{QueryError, QueryResult};
use crate::executor::{Executor, Row};
use crate::value::Value;
use std::sync::Arc;
use tracing::{debug, trace};

struct ConnectionInner {
    executor: Arc<dyn Executor>,
    policy: ConnectionPolicy,
    global_where: String,
    admission: AdmissionController,
}

/// A handle to the backing database.
///
/// Holds the executor capability, the frozen admission policy, and the
/// global WHERE conjunction compiled once at construction. Cloning is
/// cheap and clones share the same underlying state; the handle is safe
/// for concurrent use by multiple builder instances.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("policy", &self.inner.policy)
            .field("global_where", &self.inner.global_where)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Create a connection over an executor with an explicit configuration.
    ///
    /// The `global_conditions` mapping is compiled here, once, into a
    /// single equality conjunction; it is never recomputed per query.
    pub fn new(executor: Arc<dyn Executor>, config: ConnectionConfig) -> QueryResult<Self> {
        let global_where = build_global_where(&config.global_conditions)?;
        let policy = config.policy();
        let admission = AdmissionController::new(Arc::clone(&executor), policy.clone());

        Ok(Self {
            inner: Arc::new(ConnectionInner {
                executor,
                policy,
                global_where,
                admission,
            }),
        })
    }

    /// The precomputed global WHERE conjunction; empty when unconfigured.
    pub fn global_where(&self) -> &str {
        &self.inner.global_where
    }

    /// The frozen admission-control policy.
    pub fn policy(&self) -> &ConnectionPolicy {
        &self.inner.policy
    }

    /// Request parameters from the executor's host framework.
    pub fn request_parameters(&self) -> Row {
        self.inner.executor.request_parameters()
    }

    /// Execute a SQL statement, optionally gated by admission control.
    ///
    /// With `use_admission_control`, the call waits for database capacity
    /// first and fails with [`QueryError::WaitTimeout`] if none appears;
    /// the query is then never executed. Executor failures are wrapped
    /// into [`QueryError::Execution`] with the cause attached.
    pub async fn execute(&self, sql: &str, use_admission_control: bool) -> QueryResult<Vec<Row>> {
        if use_admission_control {
            self.inner.admission.acquire().await?;
        }

        debug!(pool = %self.inner.policy.pool_name, "executing query");
        trace!(%sql);

        self.inner
            .executor
            .execute(sql)
            .await
            .map_err(QueryError::execution)
    }
}

/// Compile the configured field-to-literal mapping into one equality
/// conjunction.
fn build_global_where(conditions: &[(String, Value)]) -> QueryResult<String> {
    let parts: Vec<String> = conditions
        .iter()
        .map(|(field, value)| compile_eq(field, value))
        .collect::<QueryResult<_>>()?;
    Ok(parts.join(" AND "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::MockExecutor;

    #[test]
    fn global_where_is_compiled_once_in_order() {
        let executor = Arc::new(MockExecutor::new());
        let config = ConnectionConfig::new()
            .with_global_condition("game_id", 1)
            .with_global_condition("region", "eu");
        let connection = Connection::new(executor, config).unwrap();
        assert_eq!(
            connection.global_where(),
            "`game_id` = 1 AND `region` = 'eu'"
        );
    }

    #[test]
    fn empty_global_mapping_compiles_to_empty_string() {
        let executor = Arc::new(MockExecutor::new());
        let connection = Connection::new(executor, ConnectionConfig::default()).unwrap();
        assert_eq!(connection.global_where(), "");
    }

    #[test]
    fn blank_global_field_is_rejected() {
        let executor = Arc::new(MockExecutor::new());
        let config = ConnectionConfig::new().with_global_condition("", 1);
        let err = Connection::new(executor, config).unwrap_err();
        assert!(matches!(err, QueryError::InvalidFieldName(_)));
    }

    #[tokio::test]
    async fn executor_failure_is_wrapped_with_cause() {
        let executor = Arc::new(MockExecutor::new());
        executor.push_error("boom");
        let connection = Connection::new(executor, ConnectionConfig::default()).unwrap();

        let err = connection.execute("SELECT 1", false).await.unwrap_err();
        match err {
            QueryError::Execution { message, source } => {
                assert_eq!(message, "boom");
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn execute_without_admission_skips_the_process_table() {
        let executor = Arc::new(MockExecutor::new());
        executor.push_rows(vec![]);
        let connection = Connection::new(executor.clone(), ConnectionConfig::default()).unwrap();

        connection.execute("SELECT 1", false).await.unwrap();
        assert_eq!(executor.executed(), vec!["SELECT 1".to_string()]);
    }
}
