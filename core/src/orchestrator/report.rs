//! Per-application, per-cycle and run-wide reports

use serde::{Deserialize, Serialize};

use crate::config::Scenario;
use crate::driver::{SessionTeardownReport, SetupReport, TeardownReport};
use crate::metrics::CohortSummary;
use crate::poller::PollTimeout;
use crate::session::{CreateFailure, TestSession};

/// What happened to one application in one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppReport {
    /// Application name
    pub application: String,

    /// Whether this cycle created the application
    pub created: bool,

    /// Instance setup, present only for newly created applications with a
    /// non-zero initial instance count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup: Option<SetupReport>,

    /// Sessions whose create succeeded
    pub sessions_created: usize,

    /// Session creates that failed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub create_failures: Vec<CreateFailure>,

    /// Set when session setup polling gave up
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_timeout: Option<PollTimeout>,

    /// Application teardown (`app_full_cycle`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_teardown: Option<TeardownReport>,

    /// Session teardown (`session_full_cycle`) or leftover session deletes
    /// (`app_full_cycle`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_teardown: Option<SessionTeardownReport>,

    /// Error that stopped this application's cycle early
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Whether a shutdown request cut this application's cycle short
    #[serde(default)]
    pub interrupted: bool,
}

impl AppReport {
    /// Empty report for `application`
    pub fn new(application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            ..Default::default()
        }
    }

    /// Whether the cycle ran to completion for this application
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// One test cycle: every application driven concurrently
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Cycle index, from 0
    pub cycle: usize,
    /// Cycle start, unix ms
    pub start_time_milli: i64,
    /// Cycle end, unix ms
    pub end_time_milli: i64,
    /// Per-application outcomes, in application index order
    pub apps: Vec<AppReport>,
    /// Summary over this cycle's sessions; `None` when none were created
    pub summary: Option<CohortSummary>,
    /// Whether a shutdown request stopped this cycle's applications
    #[serde(default)]
    pub interrupted: bool,
}

impl CycleReport {
    /// Applications whose cycle ended in an error
    pub fn failed_apps(&self) -> usize {
        self.apps.iter().filter(|a| !a.is_ok()).count()
    }
}

/// A complete load-test run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Scenario driven
    pub scenario: Scenario,
    /// Namespace of every resource
    pub namespace: String,
    /// Gateway name
    pub gateway: String,
    /// Run start, unix ms
    pub start_time_milli: i64,
    /// Run end, unix ms
    pub end_time_milli: i64,
    /// Whether a shutdown request stopped the run before all cycles finished
    pub interrupted: bool,
    /// Completed cycles
    pub cycles: Vec<CycleReport>,
    /// Summary over every session in the ledger
    pub summary: Option<CohortSummary>,
    /// Every session recorded during the run
    pub sessions: Vec<TestSession>,
}

impl RunReport {
    /// Session creates that failed across all cycles
    pub fn total_create_failures(&self) -> usize {
        self.cycles
            .iter()
            .flat_map(|c| &c.apps)
            .map(|a| a.create_failures.len())
            .sum()
    }

    /// Application cycles that ended in an error
    pub fn failed_apps(&self) -> usize {
        self.cycles.iter().map(CycleReport::failed_apps).sum()
    }

    /// Wall time of the run in ms
    pub fn duration_ms(&self) -> i64 {
        self.end_time_milli - self.start_time_milli
    }
}
