//! Test doubles shared across module tests.

use crate::error::ExecutorError;
use crate::executor::{Executor, Row};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Scripted executor: responses are served in push order, and every
/// executed statement is recorded. An exhausted script yields empty row
/// sets.
pub(crate) struct MockExecutor {
    responses: Mutex<VecDeque<Result<Vec<Row>, String>>>,
    executed: Mutex<Vec<String>>,
    request_params: Mutex<Row>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            executed: Mutex::new(Vec::new()),
            request_params: Mutex::new(Row::new()),
        }
    }

    pub fn push_rows(&self, rows: Vec<Row>) {
        self.responses.lock().unwrap().push_back(Ok(rows));
    }

    pub fn push_error(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    /// Push a single-row response `{column: value}`.
    pub fn push_count_rows(&self, column: &str, value: u64) {
        self.push_rows(vec![row(&[(column, value.into())])]);
    }

    pub fn set_request_parameters(&self, params: Row) {
        *self.request_params.lock().unwrap() = params;
    }

    /// Statements executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn execute(&self, sql: &str) -> Result<Vec<Row>, ExecutorError> {
        self.executed.lock().unwrap().push(sql.to_string());
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(rows)) => Ok(rows),
            Some(Err(message)) => Err(message.into()),
            None => Ok(Vec::new()),
        }
    }

    fn request_parameters(&self) -> Row {
        self.request_params.lock().unwrap().clone()
    }
}

/// Build a [`Row`] from `(column, value)` pairs.
pub(crate) fn row(pairs: &[(&str, serde_json::Value)]) -> Row {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}
