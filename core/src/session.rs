//! Harness-side session tracking

use crate::resource::{ApplicationSession, SessionStatus};
use crate::traits::GatewayError;
use serde::{Deserialize, Serialize};

/// A session created by the harness, with the timestamps bracketing its setup
///
/// `status` starts at [`SessionStatus::Pending`] and moves at most once, to
/// `Available`, `Timeout` or `Closed`. `available_time_micro` is only
/// meaningful once the session is `Available`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSession {
    namespace: String,
    name: String,
    application: String,
    creation_time_micro: i64,
    available_time_micro: i64,
    status: SessionStatus,
}

impl TestSession {
    /// Track a session whose create call returned at `creation_time_micro`
    pub fn new(session: &ApplicationSession, creation_time_micro: i64) -> Self {
        Self {
            namespace: session.metadata.namespace.clone(),
            name: session.metadata.name.clone(),
            application: session.spec.application_name.clone(),
            creation_time_micro,
            available_time_micro: 0,
            status: SessionStatus::Pending,
        }
    }

    /// Session namespace
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Session name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning application
    pub fn application(&self) -> &str {
        &self.application
    }

    /// Local timestamp taken when the create call returned
    pub fn creation_time_micro(&self) -> i64 {
        self.creation_time_micro
    }

    /// Server-reported availability time, 0 until observed
    pub fn available_time_micro(&self) -> i64 {
        self.available_time_micro
    }

    /// Last observed status
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Still waiting for a terminal status
    pub fn is_pending(&self) -> bool {
        self.status == SessionStatus::Pending
    }

    /// Apply a fresh server snapshot.
    ///
    /// Returns `true` when the session is (now) terminal. A session that has
    /// already left `Pending` ignores later snapshots.
    pub fn observe(&mut self, snapshot: &ApplicationSession) -> bool {
        if !self.is_pending() {
            return true;
        }

        let status = snapshot.status.session_status;
        if !status.is_terminal() {
            return false;
        }
        if status == SessionStatus::Available {
            self.available_time_micro = snapshot.status.available_time_micro;
        }
        self.status = status;
        true
    }

    /// Setup latency in microseconds, only for available sessions
    pub fn setup_latency_micros(&self) -> Option<i64> {
        (self.status == SessionStatus::Available)
            .then(|| self.available_time_micro - self.creation_time_micro)
    }
}

/// A session whose create call failed and was left out of the cohort
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFailure {
    /// Intended session name
    pub name: String,
    /// Gateway error text
    pub error: String,
}

impl CreateFailure {
    /// Record a failed create
    pub fn new(name: impl Into<String>, error: &GatewayError) -> Self {
        Self {
            name: name.into(),
            error: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ObjectMeta, SessionSpec};

    fn snapshot(status: SessionStatus, available: i64) -> ApplicationSession {
        let mut session = ApplicationSession::new(
            ObjectMeta::new("ns", "echo-abc-session-0"),
            SessionSpec {
                application_name: "echo".into(),
                ..Default::default()
            },
        );
        session.status.session_status = status;
        session.status.available_time_micro = available;
        session
    }

    #[test]
    fn test_new_session_is_pending() {
        let ts = TestSession::new(&snapshot(SessionStatus::Unspecified, 0), 1_000);
        assert!(ts.is_pending());
        assert_eq!(ts.name(), "echo-abc-session-0");
        assert_eq!(ts.application(), "echo");
        assert_eq!(ts.available_time_micro(), 0);
        assert_eq!(ts.setup_latency_micros(), None);
    }

    #[test]
    fn test_observe_available_records_time() {
        let mut ts = TestSession::new(&snapshot(SessionStatus::Pending, 0), 1_000);
        assert!(ts.observe(&snapshot(SessionStatus::Available, 4_500)));
        assert_eq!(ts.status(), SessionStatus::Available);
        assert_eq!(ts.setup_latency_micros(), Some(3_500));
    }

    #[test]
    fn test_observe_non_terminal_keeps_pending() {
        let mut ts = TestSession::new(&snapshot(SessionStatus::Pending, 0), 1_000);
        assert!(!ts.observe(&snapshot(SessionStatus::Starting, 0)));
        assert!(!ts.observe(&snapshot(SessionStatus::Closing, 0)));
        assert!(ts.is_pending());
    }

    #[test]
    fn test_observe_closed_ignores_available_time() {
        let mut ts = TestSession::new(&snapshot(SessionStatus::Pending, 0), 1_000);
        assert!(ts.observe(&snapshot(SessionStatus::Closed, 7_000)));
        assert_eq!(ts.status(), SessionStatus::Closed);
        assert_eq!(ts.available_time_micro(), 0);
        assert_eq!(ts.setup_latency_micros(), None);
    }

    #[test]
    fn test_terminal_status_never_changes() {
        let mut ts = TestSession::new(&snapshot(SessionStatus::Pending, 0), 1_000);
        ts.observe(&snapshot(SessionStatus::Timeout, 0));
        ts.observe(&snapshot(SessionStatus::Available, 9_000));
        ts.observe(&snapshot(SessionStatus::Pending, 0));

        assert_eq!(ts.status(), SessionStatus::Timeout);
        assert_eq!(ts.available_time_micro(), 0);
        assert_eq!(ts.setup_latency_micros(), None);
    }
}
