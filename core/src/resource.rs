//! Control-plane resource types
//!
//! These mirror the Fornax `Application` and `ApplicationSession` objects as
//! they travel over the Kubernetes-style REST API (camelCase JSON). The harness
//! only ever creates, reads and deletes them; status fields are owned by the
//! control plane.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// API group/version for all Fornax core resources
pub const API_VERSION: &str = "core.fornax-serverless.centaurusinfra.io/v1";

/// Label holding a microsecond-precision creation timestamp.
///
/// `creationTimestamp` only carries second precision, so the harness stamps
/// every object it creates with this label.
pub const CREATION_UNIX_MICRO_LABEL: &str =
    "core.fornax-serverless.centaurusinfra.io/creation-unix-micro";

/// Current wall-clock time in microseconds since the epoch
pub fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

/// Current wall-clock time in milliseconds since the epoch
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

// ============================================================================
// Metadata
// ============================================================================

/// Object metadata shared by all resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Resource name
    pub name: String,

    /// Namespace the resource lives in
    #[serde(default)]
    pub namespace: String,

    /// Labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Server-assigned creation time (second precision)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    /// Create metadata for `namespace/name`
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Add a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Stamp the creation-time label with the given microsecond timestamp
    pub fn with_creation_micros(self, micros: i64) -> Self {
        self.with_label(CREATION_UNIX_MICRO_LABEL, micros.to_string())
    }

    /// Creation time in microseconds.
    ///
    /// Prefers the microsecond label and falls back to `creationTimestamp`.
    pub fn creation_unix_micro(&self) -> Option<i64> {
        self.labels
            .get(CREATION_UNIX_MICRO_LABEL)
            .and_then(|v| v.parse::<i64>().ok())
            .or_else(|| self.creation_timestamp.map(|ts| ts.timestamp_micros()))
    }

    /// `namespace/name`
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

// ============================================================================
// Application
// ============================================================================

/// A scalable pool of workload instances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    /// API version
    #[serde(default)]
    pub api_version: String,
    /// Kind
    #[serde(default)]
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Desired state
    #[serde(default)]
    pub spec: ApplicationSpec,
    /// Observed state (control-plane owned)
    #[serde(default)]
    pub status: ApplicationStatus,
}

impl Application {
    /// Resource kind name
    pub const KIND: &'static str = "Application";

    /// Build a new application object ready to be submitted
    pub fn new(metadata: ObjectMeta, spec: ApplicationSpec) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: Self::KIND.to_string(),
            metadata,
            spec,
            status: ApplicationStatus::default(),
        }
    }

    /// Instances currently serving sessions
    pub fn active_instances(&self) -> u32 {
        self.status
            .running_instances
            .saturating_sub(self.status.idle_instances)
    }
}

/// Application desired state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    /// Workload containers
    #[serde(default)]
    pub containers: Vec<Container>,
    /// Free-form configuration passed to instances
    #[serde(default)]
    pub config_data: BTreeMap<String, String>,
    /// Autoscaling policy
    #[serde(default)]
    pub scaling_policy: ScalingPolicy,
}

/// Container definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Container name
    pub name: String,
    /// Image reference
    pub image: String,
    /// Exposed ports
    #[serde(default)]
    pub ports: Vec<ContainerPort>,
    /// Environment
    #[serde(default)]
    pub env: Vec<EnvVar>,
    /// Resource limits and requests
    #[serde(default)]
    pub resources: ResourceRequirements,
}

/// Named container port
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    /// Port name
    pub name: String,
    /// Port number
    pub container_port: u16,
}

/// Environment variable
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    /// Variable name
    pub name: String,
    /// Variable value
    pub value: String,
}

/// Resource quantities keyed by resource name (`cpu`, `memory`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    /// Hard limits
    #[serde(default)]
    pub limits: BTreeMap<String, String>,
    /// Scheduling requests
    #[serde(default)]
    pub requests: BTreeMap<String, String>,
}

/// Scaling-policy type driven by the number of idle sessions
pub const IDLE_SESSION_NUMBER_POLICY: &str = "idle_session_number";

/// Autoscaling parameters submitted at application creation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScalingPolicy {
    /// Instances kept warm at all times
    pub minimum_instance: u32,
    /// Instance ceiling
    pub maximum_instance: u32,
    /// Instances started per scaling step
    pub burst: u32,
    /// Scaling trigger
    pub scaling_policy_type: String,
    /// Watermarks for the idle-session trigger
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_session_num_threshold: Option<IdleSessionNumThreshold>,
}

/// Idle-session watermarks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdleSessionNumThreshold {
    /// Scale up above this many idle sessions
    pub high_water_mark: u32,
    /// Scale down below this many idle sessions
    pub low_water_mark: u32,
}

/// Application observed state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStatus {
    /// All instances known to the control plane
    #[serde(default)]
    pub total_instances: u32,
    /// Instances that are up
    #[serde(default)]
    pub running_instances: u32,
    /// Running instances without a session
    #[serde(default)]
    pub idle_instances: u32,
}

// ============================================================================
// Session
// ============================================================================

/// A short-lived unit of work bound to one application instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSession {
    /// API version
    #[serde(default)]
    pub api_version: String,
    /// Kind
    #[serde(default)]
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Desired state
    pub spec: SessionSpec,
    /// Observed state (control-plane owned)
    #[serde(default)]
    pub status: ApplicationSessionStatus,
}

impl ApplicationSession {
    /// Resource kind name
    pub const KIND: &'static str = "ApplicationSession";

    /// Build a new session object ready to be submitted
    pub fn new(metadata: ObjectMeta, spec: SessionSpec) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: Self::KIND.to_string(),
            metadata,
            spec,
            status: ApplicationSessionStatus::default(),
        }
    }
}

/// Session desired state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSpec {
    /// Owning application
    pub application_name: String,
    /// Opaque payload handed to the session wrapper
    #[serde(default)]
    pub session_data: String,
    /// Whether closing the session also kills its instance
    #[serde(default)]
    pub kill_instance_when_session_closed: bool,
    /// Grace period after close
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_grace_period_seconds: Option<u16>,
    /// Time the control plane waits for the session to open
    #[serde(default)]
    pub open_timeout_seconds: u16,
}

/// Session observed state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSessionStatus {
    /// Lifecycle state
    #[serde(default)]
    pub session_status: SessionStatus,
    /// When the session became available, microseconds since the epoch
    #[serde(default)]
    pub available_time_micro: i64,
}

/// Session lifecycle state as reported by the control plane
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Not yet reported
    #[default]
    #[serde(rename = "")]
    Unspecified,
    /// Accepted, waiting for an instance
    Pending,
    /// Bound to an instance, opening
    Starting,
    /// Ready to serve
    Available,
    /// Being closed
    Closing,
    /// Closed (treated as a failed setup)
    Closed,
    /// Did not open within its timeout
    Timeout,
}

impl SessionStatus {
    /// Available, closed and timed-out sessions are done with setup
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Available | SessionStatus::Closed | SessionStatus::Timeout
        )
    }

    /// Lowercase label used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Unspecified => "unspecified",
            SessionStatus::Pending => "pending",
            SessionStatus::Starting => "starting",
            SessionStatus::Available => "available",
            SessionStatus::Closing => "closing",
            SessionStatus::Closed => "closed",
            SessionStatus::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
