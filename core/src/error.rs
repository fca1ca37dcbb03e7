//! Error types for fornax-loadtest-core

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::poller::PollTimeout;
use crate::traits::GatewayError;

/// Broad classification of a [`LoadTestError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid or missing configuration
    Config,
    /// A control-plane call failed
    Gateway,
    /// A polling loop exhausted its deadline or attempt budget
    PollTimeout,
    /// The run was asked to stop
    Shutdown,
    /// Task coordination failed (panicked or failed app tasks)
    Orchestration,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Config => "config",
            ErrorKind::Gateway => "gateway",
            ErrorKind::PollTimeout => "poll timeout",
            ErrorKind::Shutdown => "shutdown",
            ErrorKind::Orchestration => "orchestration",
        };
        f.write_str(name)
    }
}

/// Core error type
#[derive(Error, Debug, Clone)]
#[error("{kind} error: {message}")]
pub struct LoadTestError {
    /// Error classification
    pub kind: ErrorKind,

    /// Human readable detail
    pub message: String,

    /// Set when the error came from an exhausted poll
    pub timeout: Option<PollTimeout>,
}

impl LoadTestError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            timeout: None,
        }
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    /// A required builder field was not provided
    pub fn missing_config(field: &str) -> Self {
        Self::new(ErrorKind::Config, format!("missing required field: {field}"))
    }

    /// A control-plane operation failed
    pub fn gateway(operation: &str, err: &GatewayError) -> Self {
        Self::new(ErrorKind::Gateway, format!("{operation}: {err}"))
    }

    /// Shutdown was requested
    pub fn shutdown() -> Self {
        Self::new(ErrorKind::Shutdown, "shutdown requested")
    }

    /// Orchestration failure
    pub fn orchestration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Orchestration, message)
    }

    /// Whether this error is an exhausted poll
    pub fn is_poll_timeout(&self) -> bool {
        self.kind == ErrorKind::PollTimeout
    }
}

impl From<PollTimeout> for LoadTestError {
    fn from(timeout: PollTimeout) -> Self {
        Self {
            kind: ErrorKind::PollTimeout,
            message: timeout.to_string(),
            timeout: Some(timeout),
        }
    }
}

/// Result type alias
pub type LoadTestResult<T> = std::result::Result<T, LoadTestError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_missing_config_names_field() {
        let err = LoadTestError::missing_config("gateway");
        assert_eq!(err.kind, ErrorKind::Config);
        assert!(err.message.contains("gateway"));
    }

    #[test]
    fn test_poll_timeout_conversion_keeps_details() {
        let timeout = PollTimeout {
            what: "application default/echo".into(),
            attempts: 3,
            elapsed: Duration::from_millis(600),
        };
        let err = LoadTestError::from(timeout.clone());

        assert!(err.is_poll_timeout());
        assert_eq!(err.timeout, Some(timeout));
        assert!(err.to_string().contains("default/echo"));
    }

    #[test]
    fn test_gateway_error_message() {
        let err = LoadTestError::gateway(
            "create application",
            &GatewayError::AlreadyExists {
                resource: "applications/echo".into(),
            },
        );
        assert_eq!(err.kind, ErrorKind::Gateway);
        assert!(err.to_string().starts_with("gateway error: create application"));
    }
}
