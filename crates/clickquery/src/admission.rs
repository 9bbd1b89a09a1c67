//! Admission control: a polling concurrency limiter.
//!
//! Before a query is issued, the controller reads the live running-query
//! count from the database's own process table and waits, with randomized
//! backoff, until capacity is available or its attempts are exhausted.
//!
//! This is advisory throttling, not a lease: no slot is reserved, so a
//! race between the check and the subsequent query is possible and
//! accepted.

use crate::config::ConnectionPolicy;
use crate::error::{QueryError, QueryResult};
use crate::executor::{Executor, field_as_u64};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const RUNNING_QUERIES_SQL: &str =
    "SELECT COUNT(*) AS running_queries FROM system.processes";

/// Gates query execution on the live server load.
pub struct AdmissionController {
    executor: Arc<dyn Executor>,
    policy: ConnectionPolicy,
}

impl AdmissionController {
    /// Create a controller over an executor and a frozen policy.
    pub fn new(executor: Arc<dyn Executor>, policy: ConnectionPolicy) -> Self {
        Self { executor, policy }
    }

    /// Wait until the database has capacity for one more query.
    ///
    /// Each attempt polls the running-query count. An unavailable count
    /// (poll failure or missing column) admits immediately, as does a
    /// count strictly below the ceiling. Otherwise the task sleeps a
    /// uniformly random duration within the policy's wait bounds and
    /// retries, failing with [`QueryError::WaitTimeout`] once the attempt
    /// budget is spent.
    pub async fn acquire(&self) -> QueryResult<()> {
        let mut attempt = 0u32;

        while attempt < self.policy.max_wait_attempts {
            attempt += 1;

            match self.running_queries().await {
                Some(running) if running >= u64::from(self.policy.max_running_processes) => {
                    warn!(
                        pool = %self.policy.pool_name,
                        running,
                        ceiling = self.policy.max_running_processes,
                        attempt,
                        "database saturated, backing off"
                    );
                    tokio::time::sleep(self.backoff_interval()).await;
                }
                _ => {
                    if attempt > 1 {
                        debug!(pool = %self.policy.pool_name, attempt, "admitted after waiting");
                    }
                    return Ok(());
                }
            }
        }

        Err(QueryError::WaitTimeout {
            attempts: self.policy.max_wait_attempts,
        })
    }

    fn backoff_interval(&self) -> Duration {
        let min = self.policy.wait_min.as_micros() as u64;
        let max = self.policy.wait_max.as_micros() as u64;
        let micros = if max > min {
            rand::rng().random_range(min..=max)
        } else {
            min
        };
        Duration::from_micros(micros)
    }

    /// Poll the live running-query count.
    ///
    /// `None` means the count is unknown: the poll failed or the server
    /// returned no usable value. Unknown load admits the caller rather
    /// than blocking queries on a broken probe.
    async fn running_queries(&self) -> Option<u64> {
        match self.executor.execute(RUNNING_QUERIES_SQL).await {
            Ok(rows) => rows
                .first()
                .and_then(|row| row.get("running_queries"))
                .and_then(field_as_u64),
            Err(error) => {
                warn!(pool = %self.policy.pool_name, %error, "running-query poll failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;
    use crate::test_util::MockExecutor;

    fn policy(max_attempts: u32) -> ConnectionPolicy {
        ConnectionConfig::new()
            .with_max_running_processes(5)
            .with_max_wait_attempts(max_attempts)
            .with_wait_bounds(Duration::from_micros(100), Duration::from_micros(200))
            .policy()
    }

    #[tokio::test]
    async fn admits_immediately_when_below_ceiling() {
        let executor = Arc::new(MockExecutor::new());
        executor.push_count_rows("running_queries", 2);
        let controller = AdmissionController::new(executor.clone(), policy(3));

        controller.acquire().await.unwrap();
        assert_eq!(executor.executed().len(), 1);
    }

    #[tokio::test]
    async fn saturated_source_polls_exactly_max_attempts_then_times_out() {
        let executor = Arc::new(MockExecutor::new());
        for _ in 0..3 {
            executor.push_count_rows("running_queries", 9);
        }
        let controller = AdmissionController::new(executor.clone(), policy(3));

        let err = controller.acquire().await.unwrap_err();
        assert!(matches!(err, QueryError::WaitTimeout { attempts: 3 }));
        assert_eq!(executor.executed().len(), 3);
    }

    #[tokio::test]
    async fn poll_failure_counts_as_unknown_and_admits() {
        let executor = Arc::new(MockExecutor::new());
        executor.push_error("process table unavailable");
        let controller = AdmissionController::new(executor.clone(), policy(3));

        controller.acquire().await.unwrap();
        assert_eq!(executor.executed().len(), 1);
    }

    #[tokio::test]
    async fn missing_column_counts_as_unknown_and_admits() {
        let executor = Arc::new(MockExecutor::new());
        executor.push_rows(vec![crate::test_util::row(&[("something_else", 1.into())])]);
        let controller = AdmissionController::new(executor.clone(), policy(3));

        controller.acquire().await.unwrap();
    }

    #[tokio::test]
    async fn admits_once_load_drops() {
        let executor = Arc::new(MockExecutor::new());
        executor.push_count_rows("running_queries", 8);
        executor.push_count_rows("running_queries", 1);
        let controller = AdmissionController::new(executor.clone(), policy(5));

        controller.acquire().await.unwrap();
        assert_eq!(executor.executed().len(), 2);
    }
}
