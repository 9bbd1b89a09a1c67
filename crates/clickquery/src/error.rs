//! Error types for clickquery

use thiserror::Error;

/// Result type alias for clickquery operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Error produced by an [`Executor`](crate::Executor) implementation.
///
/// Adapters report failures through their own error types; the connection
/// layer boxes them here and attaches them as the cause of
/// [`QueryError::Execution`].
pub type ExecutorError = Box<dyn std::error::Error + Send + Sync>;

/// Error types for query construction and execution
#[derive(Debug, Error)]
pub enum QueryError {
    /// A predicate value has the wrong shape for its operator
    #[error("Invalid condition value: {0}")]
    InvalidConditionValue(String),

    /// Operator outside the supported set
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    /// Empty or otherwise unusable field name
    #[error("Invalid field name: {0}")]
    InvalidFieldName(String),

    /// Empty operator string
    #[error("Invalid operator: {0}")]
    InvalidOperator(String),

    /// NULL passed where an explicit null predicate must be used instead
    #[error("Null value rejected: {0}")]
    NullValueRejected(String),

    /// Admission control exhausted its poll attempts without finding capacity
    #[error("Timed out waiting for an available connection after {attempts} attempts")]
    WaitTimeout { attempts: u32 },

    /// Query execution failed at the executor
    #[error("Execution failed: {message}")]
    Execution {
        message: String,
        #[source]
        source: ExecutorError,
    },
}

impl QueryError {
    /// Create an invalid-condition-value error
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidConditionValue(message.into())
    }

    /// Wrap an executor failure, preserving its message and cause
    pub fn execution(source: ExecutorError) -> Self {
        Self::Execution {
            message: source.to_string(),
            source,
        }
    }

    /// Check if this is an admission-control timeout
    pub fn is_wait_timeout(&self) -> bool {
        matches!(self, Self::WaitTimeout { .. })
    }

    /// Check if this is a wrapped executor failure
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }
}
