//! Operation Context
//!
//! Metadata about the current operation: who asked, how to correlate it in
//! logs, and how long the store work may take.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Context for an operation, used for tracing and cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationContext {
    /// Owner resolved by the authenticating collaborator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller: Option<String>,

    /// Correlation ID for request tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,

    /// Point in time after which in-flight store work is abandoned and rolled back
    #[serde(skip)]
    pub deadline: Option<Instant>,
}

impl OperationContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self {
            caller: None,
            correlation_id: None,
            deadline: None,
        }
    }

    /// Create context with the calling owner
    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    /// Create context with correlation ID
    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Create context with an absolute deadline
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Create context whose deadline is `timeout` from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Generate a new correlation ID if not present
    pub fn ensure_correlation_id(&mut self) -> Uuid {
        *self.correlation_id.get_or_insert_with(Uuid::new_v4)
    }
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::new()
    }
}
