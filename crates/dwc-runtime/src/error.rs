// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for workflow execution

/// Error type for workflow execution outside of step attempts
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Document could not be loaded
    #[error("Document error: {0}")]
    Document(String),

    /// Runtime configuration error
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for workflow execution
pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by a tool function.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ToolError(pub String);

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for ToolError {
    fn from(s: String) -> Self {
        ToolError(s)
    }
}

impl From<&str> for ToolError {
    fn from(s: &str) -> Self {
        ToolError(s.to_string())
    }
}

/// A failed step attempt.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StepError {
    /// Worth another attempt.
    #[error("{0}")]
    Failed(String),

    /// Retrying cannot help, e.g. the tool is not registered.
    #[error("{0}")]
    Fatal(String),

    #[error("Step '{step_id}' exceeded timeout {timeout_seconds}s (attempt {attempt}/{attempts})")]
    Timeout {
        step_id: String,
        timeout_seconds: u64,
        attempt: u32,
        attempts: u32,
    },
}

impl StepError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, StepError::Fatal(_))
    }
}

impl From<ToolError> for StepError {
    fn from(err: ToolError) -> Self {
        StepError::Failed(err.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(StepError::Failed("x".into()).is_retryable());
        assert!(!StepError::Fatal("x".into()).is_retryable());
        let timeout = StepError::Timeout {
            step_id: "s".into(),
            timeout_seconds: 30,
            attempt: 1,
            attempts: 3,
        };
        assert!(timeout.is_retryable());
        assert_eq!(
            timeout.to_string(),
            "Step 's' exceeded timeout 30s (attempt 1/3)"
        );
    }
}
