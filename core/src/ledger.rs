//! Run-wide record of every cohort

use crate::session::TestSession;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Append-only accumulator of sessions across all cohorts of a run
///
/// Owned by the scenario runner and handed to each cohort; clones share the
/// same storage.
#[derive(Debug, Clone, Default)]
pub struct SessionLedger {
    sessions: Arc<Mutex<Vec<TestSession>>>,
}

impl SessionLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a cohort
    pub async fn append(&self, cohort: &[TestSession]) {
        self.sessions.lock().await.extend_from_slice(cohort);
    }

    /// Copy of every recorded session, in append order
    pub async fn snapshot(&self) -> Vec<TestSession> {
        self.sessions.lock().await.clone()
    }

    /// Number of recorded sessions
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Whether nothing has been recorded
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
