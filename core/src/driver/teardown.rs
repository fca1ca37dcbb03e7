//! Application and session teardown

use crate::error::{LoadTestError, LoadTestResult};
use crate::poller::{PollPolicy, PollTimeout, Poller};
use crate::resource::now_micros;
use crate::session::TestSession;
use crate::traits::{GatewayError, ResourceGateway};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// How long a deleted application took to disappear
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownReport {
    /// Application name
    pub application: String,
    /// Total instances observed just before the delete
    pub instances: u32,
    /// Delete to not-found, microseconds
    pub elapsed_micros: i64,
}

/// A session delete that failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteFailure {
    /// Session name
    pub name: String,
    /// Error text
    pub error: String,
}

/// Outcome of deleting a cohort's sessions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTeardownReport {
    /// Application name
    pub application: String,
    /// Deletes issued
    pub requested: usize,
    /// Deletes that succeeded or found the session already gone
    pub deleted: usize,
    /// Deletes that failed
    pub failures: Vec<DeleteFailure>,
    /// First delete to instances drained, microseconds; `None` when the
    /// drain was not awaited or did not finish
    pub elapsed_micros: Option<i64>,
    /// Set when the drain wait ran out of budget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timed_out: Option<PollTimeout>,
}


/// Deletes applications and sessions and waits for the control plane to drain
pub struct TeardownDriver {
    gateway: Arc<dyn ResourceGateway>,
    app_policy: PollPolicy,
    session_policy: PollPolicy,
}

impl TeardownDriver {
    /// Create a driver
    pub fn new(
        gateway: Arc<dyn ResourceGateway>,
        app_policy: PollPolicy,
        session_policy: PollPolicy,
    ) -> Self {
        Self {
            gateway,
            app_policy,
            session_policy,
        }
    }

    /// Delete an application and wait until it reads as not found
    pub async fn teardown_application(
        &self,
        namespace: &str,
        name: &str,
    ) -> LoadTestResult<TeardownReport> {
        let instances = match self.gateway.get_application(namespace, name).await {
            Ok(Some(app)) => app.status.total_instances,
            Ok(None) => 0,
            Err(e) => {
                tracing::warn!(application = name, error = %e, "Could not read application before delete");
                0
            }
        };

        let deleted_at = now_micros();
        match self.gateway.delete_application(namespace, name).await {
            Ok(()) => tracing::info!(namespace, application = name, "Application deleted"),
            Err(e) if e.is_not_found() => {
                tracing::info!(namespace, application = name, "Application already absent")
            }
            Err(e) => return Err(LoadTestError::gateway("delete application", &e)),
        }

        let mut poller = Poller::new(format!("teardown of application {namespace}/{name}"), self.app_policy);
        let gateway = self.gateway.as_ref();
        poller
            .wait_for(|| gateway.get_application(namespace, name), |app| app.is_none())
            .await?;

        let report = TeardownReport {
            application: name.to_string(),
            instances,
            elapsed_micros: now_micros() - deleted_at,
        };
        tracing::info!(
            application = name,
            elapsed_micros = report.elapsed_micros,
            instances = report.instances,
            "Application teardown complete"
        );

        Ok(report)
    }

    /// Delete every session concurrently, then wait until the application
    /// has no active instances (`running - idle == 0`) or is gone
    ///
    /// Session-level close is not confirmed. Delete outcomes are collected
    /// after the drain wait and kept when the wait times out.
    pub async fn teardown_sessions(
        &self,
        namespace: &str,
        application: &str,
        sessions: &[TestSession],
    ) -> SessionTeardownReport {
        if sessions.is_empty() {
            return SessionTeardownReport {
                application: application.to_string(),
                ..Default::default()
            };
        }

        tracing::info!(
            application,
            sessions = sessions.len(),
            "Waiting for sessions teardown"
        );

        let started_at = now_micros();
        let handles = self.spawn_deletes(sessions);

        let mut poller = Poller::new(
            format!("session teardown of application {namespace}/{application}"),
            self.session_policy,
        );
        let gateway = self.gateway.as_ref();
        let drained = poller
            .wait_for(
                || gateway.get_application(namespace, application),
                |app| app.map_or(true, |a| a.active_instances() == 0),
            )
            .await;
        let elapsed_micros = now_micros() - started_at;

        let mut report = collect_deletes(application, handles).await;
        match drained {
            Ok(_) => {
                report.elapsed_micros = Some(elapsed_micros);
                tracing::info!(
                    application,
                    elapsed_micros,
                    deleted = report.deleted,
                    failed = report.failures.len(),
                    "Session teardown complete"
                );
            }
            Err(timeout) => {
                tracing::warn!(
                    application,
                    deleted = report.deleted,
                    failed = report.failures.len(),
                    error = %timeout,
                    "Session teardown did not drain"
                );
                report.timed_out = Some(timeout);
            }
        }

        report
    }

    /// Delete sessions concurrently and collect the outcomes without waiting
    /// on the application
    pub async fn delete_sessions(
        &self,
        application: &str,
        sessions: &[TestSession],
    ) -> SessionTeardownReport {
        let handles = self.spawn_deletes(sessions);
        collect_deletes(application, handles).await
    }

    fn spawn_deletes(
        &self,
        sessions: &[TestSession],
    ) -> Vec<(String, JoinHandle<Result<(), GatewayError>>)> {
        sessions
            .iter()
            .map(|session| {
                let gateway = Arc::clone(&self.gateway);
                let namespace = session.namespace().to_string();
                let name = session.name().to_string();
                let task_name = name.clone();
                let handle =
                    tokio::spawn(async move { gateway.delete_session(&namespace, &task_name).await });
                (name, handle)
            })
            .collect()
    }
}

async fn collect_deletes(
    application: &str,
    handles: Vec<(String, JoinHandle<Result<(), GatewayError>>)>,
) -> SessionTeardownReport {
    let mut report = SessionTeardownReport {
        application: application.to_string(),
        requested: handles.len(),
        ..Default::default()
    };

    for (name, handle) in handles {
        let error = match handle.await {
            Ok(Ok(())) => None,
            Ok(Err(e)) if e.is_not_found() => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(e) => Some(format!("delete task panicked: {e}")),
        };

        match error {
            None => report.deleted += 1,
            Some(error) => {
                tracing::warn!(session = %name, error = %error, "Session delete failed");
                report.failures.push(DeleteFailure { name, error });
            }
        }
    }

    report
}

impl std::fmt::Debug for TeardownDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeardownDriver")
            .field("gateway", &self.gateway.name())
            .field("app_policy", &self.app_policy)
            .field("session_policy", &self.session_policy)
            .finish()
    }
}
