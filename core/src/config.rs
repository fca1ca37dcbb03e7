//! Load-test configuration types

use crate::poller::PollPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which lifecycle a test cycle drives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Set up app and sessions, then tear the application down
    #[default]
    AppFullCycle,
    /// Set up app and sessions, then tear the sessions down
    SessionFullCycle,
    /// Set up app and sessions only
    SessionCreate,
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Scenario::AppFullCycle => "app_full_cycle",
            Scenario::SessionFullCycle => "session_full_cycle",
            Scenario::SessionCreate => "session_create",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Scenario {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "app_full_cycle" => Ok(Scenario::AppFullCycle),
            "session_full_cycle" => Ok(Scenario::SessionFullCycle),
            "session_create" => Ok(Scenario::SessionCreate),
            other => Err(ConfigError::UnknownScenario(other.to_string())),
        }
    }
}

/// Test shape: scaling parameters, cohort size and fan-out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfiguration {
    /// Instances the control plane may start per scaling step
    pub burst_of_pod_per_app: u32,

    /// Minimum instances for each application
    pub num_of_init_pods_per_app: u32,

    /// Sessions per cohort
    pub num_of_session_per_app: usize,

    /// Lifecycle to drive
    pub scenario: Scenario,

    /// Namespace for every resource
    pub namespace: String,

    /// Applications are named `{prefix}-{index}`
    pub app_name_prefix: String,

    /// Applications driven concurrently per cycle
    pub num_of_apps: usize,

    /// Sequential cycles
    pub num_of_test_cycles: usize,
}

impl Default for TestConfiguration {
    fn default() -> Self {
        Self {
            burst_of_pod_per_app: 50,
            num_of_init_pods_per_app: 1,
            num_of_session_per_app: 10,
            scenario: Scenario::default(),
            namespace: "fornaxtest".to_string(),
            app_name_prefix: "echoserver".to_string(),
            num_of_apps: 1,
            num_of_test_cycles: 1,
        }
    }
}

impl TestConfiguration {
    /// Name of the application at `index`
    pub fn app_name(&self, index: usize) -> String {
        format!("{}-{}", self.app_name_prefix, index)
    }
}

/// Poll intervals per operation and the shared deadline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Waiting for application instances to run
    pub app_setup_interval_ms: u64,
    /// Waiting for sessions to leave pending
    pub session_setup_interval_ms: u64,
    /// Waiting for a deleted application to disappear
    pub app_teardown_interval_ms: u64,
    /// Waiting for instances to go idle after session deletes
    pub session_teardown_interval_ms: u64,
    /// Deadline for each wait; 0 waits forever
    pub timeout_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            app_setup_interval_ms: 200,
            session_setup_interval_ms: 200,
            app_teardown_interval_ms: 200,
            session_teardown_interval_ms: 500,
            timeout_secs: 600,
        }
    }
}

impl PollingConfig {
    fn policy(&self, interval_ms: u64) -> PollPolicy {
        let policy = PollPolicy::new(Duration::from_millis(interval_ms));
        if self.timeout_secs == 0 {
            policy
        } else {
            policy.with_deadline(Duration::from_secs(self.timeout_secs))
        }
    }

    /// Policy for application setup
    pub fn app_setup(&self) -> PollPolicy {
        self.policy(self.app_setup_interval_ms)
    }

    /// Policy for session setup
    pub fn session_setup(&self) -> PollPolicy {
        self.policy(self.session_setup_interval_ms)
    }

    /// Policy for application teardown
    pub fn app_teardown(&self) -> PollPolicy {
        self.policy(self.app_teardown_interval_ms)
    }

    /// Policy for session teardown
    pub fn session_teardown(&self) -> PollPolicy {
        self.policy(self.session_teardown_interval_ms)
    }
}

/// Workload submitted with every application and session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Container name
    pub container_name: String,
    /// Session-wrapper image
    pub image: String,
    /// Container port
    pub container_port: u16,
    /// Command the session wrapper runs to open a session
    pub open_session_cmd: String,
    /// Memory per instance (bytes)
    pub memory_bytes: u64,
    /// CPU per instance (millicores)
    pub cpu_millis: u64,
    /// Scaling ceiling
    pub maximum_instance: u32,
    /// Payload for each session
    pub session_data: String,
    /// Seconds the control plane waits for a session to open
    pub open_timeout_seconds: u16,
    /// Grace period after close
    pub close_grace_period_seconds: u16,
    /// Kill the instance when its session closes
    pub kill_instance_when_session_closed: bool,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            container_name: "echoserver".to_string(),
            image: "centaurusinfra.io/fornax-serverless/session-wrapper:v0.1.0".to_string(),
            container_port: 80,
            open_session_cmd: "/opt/bin/sessionwrapper-echoserver".to_string(),
            memory_bytes: 50 * 1024 * 1024,
            cpu_millis: 50,
            maximum_instance: 5000,
            session_data: "session-data".to_string(),
            open_timeout_seconds: 10,
            close_grace_period_seconds: 10,
            kill_instance_when_session_closed: false,
        }
    }
}

/// Complete harness configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadTestConfig {
    /// Test shape
    #[serde(default)]
    pub test: TestConfiguration,

    /// Polling intervals and deadline
    #[serde(default)]
    pub polling: PollingConfig,

    /// Workload definition
    #[serde(default)]
    pub workload: WorkloadConfig,

    /// Optional cap on session creates per second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<f64>,
}

impl LoadTestConfig {
    /// Set the scenario
    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.test.scenario = scenario;
        self
    }

    /// Set the session create rate limit
    pub fn with_rate_limit(mut self, rps: f64) -> Self {
        self.rate_limit = Some(rps);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let test = &self.test;
        if test.namespace.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "test.namespace",
                reason: "must not be empty".into(),
            });
        }
        if test.app_name_prefix.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "test.app_name_prefix",
                reason: "must not be empty".into(),
            });
        }
        if test.num_of_apps == 0 {
            return Err(ConfigError::InvalidValue {
                field: "test.num_of_apps",
                reason: "must be at least 1".into(),
            });
        }
        if test.num_of_test_cycles == 0 {
            return Err(ConfigError::InvalidValue {
                field: "test.num_of_test_cycles",
                reason: "must be at least 1".into(),
            });
        }
        if test.num_of_init_pods_per_app > self.workload.maximum_instance {
            return Err(ConfigError::InvalidValue {
                field: "test.num_of_init_pods_per_app",
                reason: format!(
                    "exceeds workload.maximum_instance ({})",
                    self.workload.maximum_instance
                ),
            });
        }

        let intervals = [
            ("polling.app_setup_interval_ms", self.polling.app_setup_interval_ms),
            ("polling.session_setup_interval_ms", self.polling.session_setup_interval_ms),
            ("polling.app_teardown_interval_ms", self.polling.app_teardown_interval_ms),
            ("polling.session_teardown_interval_ms", self.polling.session_teardown_interval_ms),
        ];
        for (field, value) in intervals {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "interval must be positive".into(),
                });
            }
        }

        if let Some(rps) = self.rate_limit {
            if rps <= 0.0 {
                return Err(ConfigError::InvalidRateLimit(
                    "rate limit must be positive".into(),
                ));
            }
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A field holds an unusable value
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Dotted field path
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Invalid rate limit
    #[error("Invalid rate limit: {0}")]
    InvalidRateLimit(String),

    /// Unrecognized scenario name
    #[error("unknown scenario: {0}")]
    UnknownScenario(String),
}
