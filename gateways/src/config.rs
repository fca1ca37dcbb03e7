//! Gateway selection and connection settings

use fornax_loadtest_core::GatewayError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which gateway to talk to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    /// The control plane's REST API
    #[default]
    Http,
    /// In-memory control plane
    Simulated,
}

/// `[gateway]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Gateway to build
    pub kind: GatewayKind,

    /// API server URL, e.g. `http://127.0.0.1:8001`
    pub base_url: String,

    /// Bearer token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Per-request timeout
    pub timeout_secs: u64,

    /// Simulated control-plane behavior
    pub simulated: SimulatedConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            kind: GatewayKind::Http,
            base_url: "http://127.0.0.1:8001".to_string(),
            token: None,
            timeout_secs: 30,
            simulated: SimulatedConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Config for an in-memory control plane
    pub fn simulated() -> Self {
        Self {
            kind: GatewayKind::Simulated,
            ..Default::default()
        }
    }

    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check the settings the selected gateway needs
    pub fn validate(&self) -> Result<(), GatewayError> {
        match self.kind {
            GatewayKind::Http => {
                if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
                    return Err(GatewayError::Config(format!(
                        "base_url must start with http:// or https://, got '{}'",
                        self.base_url
                    )));
                }
                if self.timeout_secs == 0 {
                    return Err(GatewayError::Config("timeout_secs must be positive".into()));
                }
                Ok(())
            }
            GatewayKind::Simulated => Ok(()),
        }
    }
}

/// `[gateway.simulated]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedConfig {
    /// Time for a new application's instances to start
    pub instance_startup_ms: u64,

    /// Time for a session to become available
    pub session_startup_ms: u64,

    /// Time for a deleted resource to disappear
    pub teardown_ms: u64,

    /// Every nth session times out instead of becoming available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_every: Option<usize>,

    /// Every nth session create is rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_create_every: Option<usize>,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            instance_startup_ms: 1000,
            session_startup_ms: 300,
            teardown_ms: 500,
            timeout_every: None,
            fail_create_every: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_http() {
        let config = GatewayConfig::default();
        assert_eq!(config.kind, GatewayKind::Http);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let config = GatewayConfig {
            base_url: "127.0.0.1:8001".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(GatewayError::Config(_))));
    }

    #[test]
    fn test_simulated_ignores_base_url() {
        let config = GatewayConfig {
            base_url: String::new(),
            ..GatewayConfig::simulated()
        };
        assert!(config.validate().is_ok());
    }
}
