//! Connection configuration.
//!
//! Configuration is an explicit value struct handed to
//! [`Connection::new`](crate::Connection::new); the core never reads
//! ambient or global state.

use crate::value::Value;
use std::time::Duration;

/// Configuration for a connection: pool identity, admission-control
/// policy, and the global predicate mapping.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Pool / connection name resolved by the executor.
    pub pool_name: String,
    /// Concurrency ceiling: new queries wait while the live running-query
    /// count is at or above this value.
    pub max_running_processes: u32,
    /// Poll attempts before a waiting query fails with a timeout.
    pub max_wait_attempts: u32,
    /// Lower bound of the randomized backoff interval.
    pub wait_min: Duration,
    /// Upper bound of the randomized backoff interval.
    pub wait_max: Duration,
    /// Mandatory equality predicates applied to every top-level query,
    /// in insertion order.
    pub global_conditions: Vec<(String, Value)>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            pool_name: "clickhouse".to_string(),
            max_running_processes: 5,
            max_wait_attempts: 60,
            wait_min: Duration::from_micros(500_000),
            wait_max: Duration::from_micros(1_000_000),
            global_conditions: Vec::new(),
        }
    }
}

impl ConnectionConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pool / connection name.
    pub fn with_pool_name(mut self, name: impl Into<String>) -> Self {
        self.pool_name = name.into();
        self
    }

    /// Set the concurrency ceiling.
    pub fn with_max_running_processes(mut self, ceiling: u32) -> Self {
        self.max_running_processes = ceiling;
        self
    }

    /// Set the number of poll attempts before timing out.
    pub fn with_max_wait_attempts(mut self, attempts: u32) -> Self {
        self.max_wait_attempts = attempts;
        self
    }

    /// Set the randomized backoff interval bounds.
    pub fn with_wait_bounds(mut self, min: Duration, max: Duration) -> Self {
        self.wait_min = min;
        self.wait_max = max;
        self
    }

    /// Add one global equality predicate.
    pub fn with_global_condition(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.global_conditions.push((field.into(), value.into()));
        self
    }

    /// Freeze this configuration into an immutable policy.
    ///
    /// Counts are clamped to at least 1 and the backoff upper bound to at
    /// least the lower bound, so a malformed configuration degrades to a
    /// usable policy instead of a panic in the wait loop.
    pub(crate) fn policy(&self) -> ConnectionPolicy {
        ConnectionPolicy {
            pool_name: self.pool_name.clone(),
            max_running_processes: self.max_running_processes.max(1),
            max_wait_attempts: self.max_wait_attempts.max(1),
            wait_min: self.wait_min,
            wait_max: self.wait_max.max(self.wait_min),
        }
    }
}

/// Immutable admission-control policy, set once at connection
/// construction.
#[derive(Debug, Clone)]
pub struct ConnectionPolicy {
    pub pool_name: String,
    pub max_running_processes: u32,
    pub max_wait_attempts: u32,
    pub wait_min: Duration,
    pub wait_max: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_values() {
        let config = ConnectionConfig::default();
        assert_eq!(config.pool_name, "clickhouse");
        assert_eq!(config.max_running_processes, 5);
        assert_eq!(config.max_wait_attempts, 60);
        assert_eq!(config.wait_min, Duration::from_micros(500_000));
        assert_eq!(config.wait_max, Duration::from_micros(1_000_000));
    }

    #[test]
    fn policy_clamps_degenerate_values() {
        let policy = ConnectionConfig::new()
            .with_max_running_processes(0)
            .with_max_wait_attempts(0)
            .with_wait_bounds(Duration::from_millis(10), Duration::from_millis(1))
            .policy();
        assert_eq!(policy.max_running_processes, 1);
        assert_eq!(policy.max_wait_attempts, 1);
        assert_eq!(policy.wait_max, policy.wait_min);
    }
}
