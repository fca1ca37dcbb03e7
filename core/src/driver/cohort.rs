//! Session cohorts: staggered creation and setup polling

use crate::config::{TestConfiguration, WorkloadConfig};
use crate::ledger::SessionLedger;
use crate::poller::{PollPolicy, PollTimeout, Poller};
use crate::resource::{now_micros, Application, ApplicationSession, ObjectMeta, SessionSpec};
use crate::session::{CreateFailure, TestSession};
use crate::traits::ResourceGateway;

use super::rate_limiter::CreateRateLimiter;
use super::stagger::{BatchStagger, DEFAULT_BATCH_PAUSE};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Name of the `index`th session of a cohort
pub fn session_name(application: &str, base_id: &str, index: usize) -> String {
    format!("{application}-{base_id}-session-{index}")
}

/// What came out of one cohort
///
/// Creation is partial by nature: `sessions` holds every session whose create
/// succeeded, `failures` every one that did not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortOutcome {
    /// Owning application
    pub application: String,
    /// Identifier shared by every session name in the cohort
    pub base_id: String,
    /// Sessions created, with their last observed status
    pub sessions: Vec<TestSession>,
    /// Creates that failed
    pub failures: Vec<CreateFailure>,
    /// Set when setup polling ran out of budget with sessions still pending
    pub timed_out: Option<PollTimeout>,
}

impl CohortOutcome {
    /// Some creates failed
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Every created session left pending
    pub fn converged(&self) -> bool {
        self.timed_out.is_none() && self.sessions.iter().all(|s| !s.is_pending())
    }
}

/// Creates session cohorts and waits for them to settle
pub struct SessionBatchDriver {
    gateway: Arc<dyn ResourceGateway>,
    workload: WorkloadConfig,
    setup_policy: PollPolicy,
    batch_pause: Duration,
    rate_limiter: CreateRateLimiter,
}

impl SessionBatchDriver {
    /// Create a driver
    pub fn new(
        gateway: Arc<dyn ResourceGateway>,
        workload: WorkloadConfig,
        setup_policy: PollPolicy,
    ) -> Self {
        Self {
            gateway,
            workload,
            setup_policy,
            batch_pause: DEFAULT_BATCH_PAUSE,
            rate_limiter: CreateRateLimiter::unlimited(),
        }
    }

    /// Cap creates per second
    pub fn with_rate_limit(mut self, rps: Option<f64>) -> Self {
        self.rate_limiter = CreateRateLimiter::new(rps);
        self
    }

    /// Override the pause between bursts
    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause = pause;
        self
    }

    fn session_request(&self, namespace: &str, application: &str, name: &str) -> ApplicationSession {
        let workload = &self.workload;
        let metadata = ObjectMeta::new(namespace, name).with_creation_micros(now_micros());
        ApplicationSession::new(
            metadata,
            SessionSpec {
                application_name: application.to_string(),
                session_data: workload.session_data.clone(),
                kill_instance_when_session_closed: workload.kill_instance_when_session_closed,
                close_grace_period_seconds: Some(workload.close_grace_period_seconds),
                open_timeout_seconds: workload.open_timeout_seconds,
            },
        )
    }

    /// Create `test.num_of_session_per_app` sessions for `application`, wait
    /// for every one to leave pending, and record the cohort in `ledger`
    pub async fn create_cohort(
        &self,
        application: &Application,
        test: &TestConfiguration,
        ledger: &SessionLedger,
    ) -> CohortOutcome {
        let namespace = application.metadata.namespace.as_str();
        let app_name = application.metadata.name.as_str();

        let mut outcome = self
            .create_sessions(namespace, app_name, test.num_of_session_per_app)
            .await;

        if let Err(timeout) = self.await_sessions(app_name, &mut outcome.sessions).await {
            let pending = outcome.sessions.iter().filter(|s| s.is_pending()).count();
            tracing::warn!(
                application = app_name,
                pending,
                error = %timeout,
                "Session setup did not converge"
            );
            outcome.timed_out = Some(timeout);
        }

        ledger.append(&outcome.sessions).await;
        outcome
    }

    /// Issue creates sequentially, staggered into five bursts
    ///
    /// Failed creates are recorded and skipped, never retried.
    pub async fn create_sessions(
        &self,
        namespace: &str,
        application: &str,
        count: usize,
    ) -> CohortOutcome {
        let base_id = uuid::Uuid::new_v4().to_string();
        let stagger = BatchStagger::for_cohort(count).with_pause(self.batch_pause);
        let mut sessions = Vec::with_capacity(count);
        let mut failures = Vec::new();

        for index in 0..count {
            self.rate_limiter.wait().await;

            let name = session_name(application, &base_id, index);
            let request = self.session_request(namespace, application, &name);
            match self.gateway.create_session(&request).await {
                Ok(created) => sessions.push(TestSession::new(&created, now_micros())),
                Err(e) => {
                    tracing::warn!(
                        application,
                        session = %name,
                        error = %e,
                        "Session create failed, dropping from cohort"
                    );
                    failures.push(CreateFailure::new(name, &e));
                }
            }

            stagger.after_create(index).await;
        }

        tracing::debug!(
            application,
            created = sessions.len(),
            failed = failures.len(),
            batch_size = stagger.batch_size(),
            "Session creates issued"
        );

        CohortOutcome {
            application: application.to_string(),
            base_id,
            sessions,
            failures,
            timed_out: None,
        }
    }

    /// Poll every pending session until all are terminal
    ///
    /// Each interval re-reads only the sessions still pending. A session that
    /// reads as not found, or whose read fails, stays pending.
    pub async fn await_sessions(
        &self,
        application: &str,
        sessions: &mut [TestSession],
    ) -> Result<(), PollTimeout> {
        if sessions.is_empty() {
            return Ok(());
        }

        tracing::info!(
            application,
            sessions = sessions.len(),
            "Waiting for sessions setup"
        );

        let mut poller = Poller::new(
            format!("{} sessions of application {application}", sessions.len()),
            self.setup_policy,
        );

        loop {
            poller.tick().await?;

            let mut all_setup = true;
            for session in sessions.iter_mut().filter(|s| s.is_pending()) {
                let read = self
                    .gateway
                    .get_session(session.namespace(), session.name())
                    .await;
                match read {
                    Ok(Some(snapshot)) => {
                        if !session.observe(&snapshot) {
                            all_setup = false;
                        }
                    }
                    Ok(None) => all_setup = false,
                    Err(e) => {
                        tracing::debug!(
                            session = session.name(),
                            error = %e,
                            "Session read failed, retrying next interval"
                        );
                        all_setup = false;
                    }
                }
            }

            if all_setup {
                tracing::debug!(application, polls = poller.attempts(), "All sessions settled");
                return Ok(());
            }
        }
    }
}

impl std::fmt::Debug for SessionBatchDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBatchDriver")
            .field("gateway", &self.gateway.name())
            .field("setup_policy", &self.setup_policy)
            .field("batch_pause", &self.batch_pause)
            .field("rate_limiter", &self.rate_limiter)
            .finish()
    }
}
