//! fornax-loadtest-core: Lifecycle load testing for the Fornax serverless control plane
//!
//! This crate provides the pieces of the harness that do not depend on how
//! the control plane is reached:
//!
//! - Resource model (applications, sessions) and the gateway trait
//! - Fixed-interval polling with deadlines
//! - Application, session-cohort and teardown drivers
//! - Setup latency statistics
//! - The scenario runner that strings them into test cycles

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod driver;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod orchestrator;
pub mod poller;
pub mod resource;
pub mod session;
pub mod traits;

pub use config::{ConfigError, LoadTestConfig, PollingConfig, Scenario, TestConfiguration, WorkloadConfig};
pub use error::*;
pub use ledger::SessionLedger;
pub use metrics::{summarize, CohortSummary, SetupLatency};
pub use orchestrator::{AppReport, CycleReport, RunReport, ScenarioRunner, ScenarioRunnerBuilder};
pub use poller::{PollPolicy, PollTimeout, Poller};
pub use resource::*;
pub use session::{CreateFailure, TestSession};
pub use traits::*;

#[cfg(test)]
mod integration_tests {
    use super::*;

    // =========================================================================
    // Wire format tests
    // =========================================================================

    #[test]
    fn test_session_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Available).unwrap(),
            "\"Available\""
        );
        let unspecified: SessionStatus = serde_json::from_str("\"\"").unwrap();
        assert_eq!(unspecified, SessionStatus::Unspecified);
    }

    #[test]
    fn test_application_json_is_camel_case() {
        let app = Application::new(
            ObjectMeta::new("fornaxtest", "echoserver-0").with_creation_micros(42),
            ApplicationSpec::default(),
        );
        let json = serde_json::to_string(&app).unwrap();

        assert!(json.contains("\"apiVersion\":\"core.fornax-serverless.centaurusinfra.io/v1\""));
        assert!(json.contains("\"kind\":\"Application\""));
        assert!(json.contains("\"scalingPolicy\""));
        assert!(json.contains(CREATION_UNIX_MICRO_LABEL));
    }

    #[test]
    fn test_session_status_from_server_json() {
        let json = r#"{
            "metadata": {"name": "s-0", "namespace": "fornaxtest"},
            "spec": {"applicationName": "echoserver-0", "openTimeoutSeconds": 10},
            "status": {"sessionStatus": "Available", "availableTimeMicro": 1700000000123456}
        }"#;
        let session: ApplicationSession = serde_json::from_str(json).unwrap();

        assert_eq!(session.spec.application_name, "echoserver-0");
        assert_eq!(session.status.session_status, SessionStatus::Available);
        assert_eq!(session.status.available_time_micro, 1_700_000_000_123_456);
    }

    // =========================================================================
    // Summary tests
    // =========================================================================

    #[test]
    fn test_ten_sessions_over_one_second() {
        let sessions: Vec<TestSession> = (0..10)
            .map(|i| {
                let name = format!("s-{i}");
                let pending =
                    ApplicationSession::new(ObjectMeta::new("ns", name), SessionSpec::default());
                let mut ts = TestSession::new(&pending, 1_000);
                let mut available = pending;
                available.status.session_status = SessionStatus::Available;
                available.status.available_time_micro = 1_000 + (i + 1) * 100;
                ts.observe(&available);
                ts
            })
            .collect();

        let summary = summarize(&sessions, 0, 1_000).unwrap();
        assert_eq!(summary.success, 10);
        assert_eq!(summary.sessions_per_second, Some(10));

        let latency = summary.setup_latency.unwrap();
        assert_eq!(latency.p50_micros, 600);
        assert_eq!(latency.p90_micros, 1_000);
        assert_eq!(latency.p99_micros, 1_000);
        assert_eq!(latency.p99_session, "s-9");
    }
}
