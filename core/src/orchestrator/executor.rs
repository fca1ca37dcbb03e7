//! Scenario execution logic

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

use crate::config::{LoadTestConfig, Scenario, TestConfiguration};
use crate::driver::{ApplicationDriver, SessionBatchDriver, TeardownDriver};
use crate::error::{ErrorKind, LoadTestError, LoadTestResult};
use crate::ledger::SessionLedger;
use crate::metrics::summarize;
use crate::resource::now_millis;
use crate::session::TestSession;
use crate::traits::ResourceGateway;

use super::report::{AppReport, CycleReport, RunReport};

/// Drivers and settings shared by every application task
struct AppContext {
    test: TestConfiguration,
    apps: ApplicationDriver,
    sessions: SessionBatchDriver,
    teardown: TeardownDriver,
    ledger: SessionLedger,
}

/// One application task's result
struct AppRun {
    report: AppReport,
    sessions: Vec<TestSession>,
}

impl AppContext {
    /// Drive one application, abandoning it when shutdown is requested
    ///
    /// Resources the cycle already created are left in place on shutdown.
    async fn run_app(&self, name: String, mut shutdown: broadcast::Receiver<()>) -> AppRun {
        let mut run = AppRun {
            report: AppReport::new(name),
            sessions: Vec::new(),
        };

        let result = tokio::select! {
            result = self.drive_app(&mut run) => result,
            _ = shutdown.recv() => Err(LoadTestError::shutdown()),
        };

        match result {
            Ok(()) => {}
            Err(e) if e.kind == ErrorKind::Shutdown => {
                tracing::warn!(application = %run.report.application, "Application cycle interrupted");
                run.report.interrupted = true;
                run.report.error = Some(e.to_string());
            }
            Err(e) => {
                tracing::error!(application = %run.report.application, error = %e, "Application cycle failed");
                run.report.error = Some(e.to_string());
            }
        }

        run
    }

    async fn drive_app(&self, run: &mut AppRun) -> LoadTestResult<()> {
        let namespace = self.test.namespace.as_str();
        let name = run.report.application.clone();

        let setup = self.apps.ensure_application(namespace, &name, &self.test).await?;
        run.report.created = setup.created;
        if setup.created {
            run.report.setup = self
                .apps
                .await_running(namespace, &name, self.test.num_of_init_pods_per_app)
                .await?;
        }

        let outcome = self
            .sessions
            .create_cohort(&setup.application, &self.test, &self.ledger)
            .await;
        run.report.sessions_created = outcome.sessions.len();
        run.report.create_failures = outcome.failures;
        run.report.setup_timeout = outcome.timed_out;
        run.sessions = outcome.sessions;

        match self.test.scenario {
            Scenario::AppFullCycle => {
                run.report.app_teardown =
                    Some(self.teardown.teardown_application(namespace, &name).await?);
                run.report.session_teardown =
                    Some(self.teardown.delete_sessions(&name, &run.sessions).await);
            }
            Scenario::SessionFullCycle => {
                run.report.session_teardown = Some(
                    self.teardown
                        .teardown_sessions(namespace, &name, &run.sessions)
                        .await,
                );
            }
            Scenario::SessionCreate => {}
        }

        Ok(())
    }
}

/// ScenarioRunner drives test cycles against the control plane
///
/// Each cycle spawns one task per application, waits for all of them, and
/// summarizes the cycle's sessions. A shutdown request stops in-flight
/// application tasks and skips the remaining cycles.
pub struct ScenarioRunner {
    /// Load-test configuration
    pub(crate) config: LoadTestConfig,

    /// Gateway name, for reports
    gateway_name: String,

    /// Shared by every application task
    context: Arc<AppContext>,

    /// Shutdown signal sender
    pub(crate) shutdown_tx: broadcast::Sender<()>,

    /// Subscribed at construction so early requests are not lost
    shutdown_rx: broadcast::Receiver<()>,
}

impl ScenarioRunner {
    /// Create a new runner
    ///
    /// Use `ScenarioRunnerBuilder` for a more ergonomic construction.
    pub fn new(
        config: LoadTestConfig,
        gateway: Arc<dyn ResourceGateway>,
        ledger: SessionLedger,
        batch_pause: Duration,
    ) -> Self {
        let polling = &config.polling;
        let context = AppContext {
            test: config.test.clone(),
            apps: ApplicationDriver::new(
                Arc::clone(&gateway),
                config.workload.clone(),
                polling.app_setup(),
            ),
            sessions: SessionBatchDriver::new(
                Arc::clone(&gateway),
                config.workload.clone(),
                polling.session_setup(),
            )
            .with_rate_limit(config.rate_limit)
            .with_batch_pause(batch_pause),
            teardown: TeardownDriver::new(
                Arc::clone(&gateway),
                polling.app_teardown(),
                polling.session_teardown(),
            ),
            ledger,
        };
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        Self {
            gateway_name: gateway.name().to_string(),
            config,
            context: Arc::new(context),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Get a shutdown signal sender
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Stop in-flight applications and skip remaining cycles
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get the load-test configuration
    pub fn config(&self) -> &LoadTestConfig {
        &self.config
    }

    /// The ledger this runner records into
    pub fn ledger(&self) -> &SessionLedger {
        &self.context.ledger
    }

    fn shutdown_requested(&mut self) -> bool {
        match self.shutdown_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Lagged(_)) => true,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => false,
        }
    }

    /// Run every configured cycle
    ///
    /// Returns the run report, including an overall summary across the
    /// ledger.
    pub async fn run(&mut self) -> LoadTestResult<RunReport> {
        let test = &self.config.test;
        tracing::info!(
            scenario = %test.scenario,
            namespace = %test.namespace,
            apps = test.num_of_apps,
            cycles = test.num_of_test_cycles,
            sessions_per_app = test.num_of_session_per_app,
            gateway = %self.gateway_name,
            rate_limit = ?self.config.rate_limit,
            "Starting load test"
        );

        let start_time_milli = now_millis();
        let num_apps = test.num_of_apps;
        let mut cycles = Vec::with_capacity(test.num_of_test_cycles);
        let mut interrupted = false;

        for cycle in 0..self.config.test.num_of_test_cycles {
            // subscribe before checking so a request between the two is seen
            let signals: Vec<_> = (0..num_apps)
                .map(|_| self.shutdown_tx.subscribe())
                .collect();
            if self.shutdown_requested() {
                tracing::info!(completed_cycles = cycle, "Shutdown requested, stopping before next cycle");
                interrupted = true;
                break;
            }

            let report = self.run_cycle(cycle, signals).await?;
            let stopped = report.interrupted;
            cycles.push(report);
            if stopped {
                tracing::info!(cycle, "Shutdown requested, cycle interrupted");
                interrupted = true;
                break;
            }
        }

        let end_time_milli = now_millis();
        let sessions = self.context.ledger.snapshot().await;
        tracing::info!(sessions = sessions.len(), "Overall summary");
        let summary = summarize(&sessions, start_time_milli, end_time_milli);

        let report = RunReport {
            scenario: self.config.test.scenario,
            namespace: self.config.test.namespace.clone(),
            gateway: self.gateway_name.clone(),
            start_time_milli,
            end_time_milli,
            interrupted,
            cycles,
            summary,
            sessions,
        };

        tracing::info!(
            elapsed_ms = report.duration_ms(),
            cycles = report.cycles.len(),
            failed_apps = report.failed_apps(),
            create_failures = report.total_create_failures(),
            "Load test completed"
        );

        Ok(report)
    }

    async fn run_cycle(
        &self,
        cycle: usize,
        signals: Vec<broadcast::Receiver<()>>,
    ) -> LoadTestResult<CycleReport> {
        let test = &self.config.test;
        tracing::info!(cycle, apps = test.num_of_apps, "Starting test cycle");
        let start_time_milli = now_millis();

        let names: Vec<String> = (0..test.num_of_apps).map(|i| test.app_name(i)).collect();
        let handles = names.iter().cloned().zip(signals).map(|(name, shutdown)| {
            let context = Arc::clone(&self.context);
            tokio::spawn(async move { context.run_app(name, shutdown).await })
        });
        let results = futures::future::join_all(handles).await;

        let mut apps = Vec::with_capacity(results.len());
        let mut sessions = Vec::new();
        for (name, result) in names.into_iter().zip(results) {
            match result {
                Ok(run) => {
                    sessions.extend(run.sessions);
                    apps.push(run.report);
                }
                Err(e) => {
                    tracing::error!(application = %name, error = %e, "Application task panicked");
                    let mut report = AppReport::new(name);
                    report.error = Some(format!("task panicked: {e}"));
                    apps.push(report);
                }
            }
        }

        let end_time_milli = now_millis();
        let interrupted = apps.iter().any(|a| a.interrupted);

        if !interrupted && !apps.is_empty() && apps.iter().all(|a| !a.is_ok()) {
            return Err(LoadTestError::orchestration(format!(
                "All {} application tasks failed in cycle {}",
                apps.len(),
                cycle
            )));
        }

        tracing::info!(cycle, sessions = sessions.len(), "Test cycle summary");
        let summary = summarize(&sessions, start_time_milli, end_time_milli);

        Ok(CycleReport {
            cycle,
            start_time_milli,
            end_time_milli,
            apps,
            summary,
            interrupted,
        })
    }

    /// Run with Ctrl+C signal handling
    ///
    /// Ctrl+C stops in-flight applications and returns the partial report.
    pub async fn run_with_signal_handling(&mut self) -> LoadTestResult<RunReport> {
        let shutdown_tx = self.shutdown_tx.clone();

        let signal_handle = tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Received Ctrl+C, stopping in-flight applications...");
                    let _ = shutdown_tx.send(());
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                }
            }
        });

        let result = self.run().await;

        signal_handle.abort();

        result
    }
}

impl std::fmt::Debug for ScenarioRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioRunner")
            .field("config", &self.config)
            .field("gateway", &self.gateway_name)
            .finish()
    }
}
