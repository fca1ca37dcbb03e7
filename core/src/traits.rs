//! Resource gateway trait
//!
//! The control plane is only ever reached through [`ResourceGateway`].
//! Implementations live in the gateways crate (HTTP, simulated).

use crate::resource::{Application, ApplicationSession};
use async_trait::async_trait;

/// Create/get/delete access to Fornax applications and sessions
///
/// `get_*` returns `Ok(None)` when the resource is absent so pollers can treat
/// absence as a signal rather than a failure. `delete_*` reports absence as
/// [`GatewayError::NotFound`].
///
/// Implementations must be safe for concurrent use: session deletes are issued
/// from independent tasks.
#[async_trait]
pub trait ResourceGateway: Send + Sync {
    /// Gateway identifier (e.g., "http", "simulated")
    fn name(&self) -> &str;

    /// Submit a new application
    async fn create_application(&self, application: &Application)
        -> Result<Application, GatewayError>;

    /// Read an application
    async fn get_application(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Application>, GatewayError>;

    /// Delete an application
    async fn delete_application(&self, namespace: &str, name: &str) -> Result<(), GatewayError>;

    /// Submit a new session
    async fn create_session(
        &self,
        session: &ApplicationSession,
    ) -> Result<ApplicationSession, GatewayError>;

    /// Read a session
    async fn get_session(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ApplicationSession>, GatewayError>;

    /// Delete a session
    async fn delete_session(&self, namespace: &str, name: &str) -> Result<(), GatewayError>;
}

/// Gateway errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Resource does not exist
    #[error("not found: {resource}")]
    NotFound {
        /// `kind/namespace/name`
        resource: String,
    },

    /// Resource already exists
    #[error("already exists: {resource}")]
    AlreadyExists {
        /// `kind/namespace/name`
        resource: String,
    },

    /// Network or connection failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success status from the API server
    #[error("server returned {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Response body could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// Gateway misconfiguration
    #[error("configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Resource absent
    pub fn not_found(resource: impl Into<String>) -> Self {
        GatewayError::NotFound {
            resource: resource.into(),
        }
    }

    /// Check for the absent-resource outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound { .. })
    }
}
