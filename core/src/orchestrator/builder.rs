//! Builder pattern for ScenarioRunner construction

use std::sync::Arc;
use std::time::Duration;

use crate::config::LoadTestConfig;
use crate::driver::DEFAULT_BATCH_PAUSE;
use crate::error::{LoadTestError, LoadTestResult};
use crate::ledger::SessionLedger;
use crate::traits::ResourceGateway;

use super::executor::ScenarioRunner;

/// Builder for creating a ScenarioRunner with proper configuration
///
/// # Example
///
/// ```ignore
/// let mut runner = ScenarioRunnerBuilder::new()
///     .config(config)
///     .gateway(gateway)
///     .build()?;
///
/// let report = runner.run_with_signal_handling().await?;
/// ```
pub struct ScenarioRunnerBuilder {
    config: LoadTestConfig,
    gateway: Option<Arc<dyn ResourceGateway>>,
    ledger: Option<SessionLedger>,
    batch_pause: Duration,
}

impl ScenarioRunnerBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LoadTestConfig::default(),
            gateway: None,
            ledger: None,
            batch_pause: DEFAULT_BATCH_PAUSE,
        }
    }

    /// Set the full load-test configuration
    pub fn config(mut self, config: LoadTestConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the control-plane gateway
    pub fn gateway(mut self, gateway: Arc<dyn ResourceGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Record sessions into an existing ledger instead of a fresh one
    pub fn ledger(mut self, ledger: SessionLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Override the pause between session create bursts
    pub fn batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause = pause;
        self
    }

    /// Build the runner
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway is not set or if configuration
    /// validation fails.
    pub fn build(self) -> LoadTestResult<ScenarioRunner> {
        let gateway = self
            .gateway
            .ok_or_else(|| LoadTestError::missing_config("gateway"))?;

        self.config
            .validate()
            .map_err(|e| LoadTestError::config(e.to_string()))?;

        Ok(ScenarioRunner::new(
            self.config,
            gateway,
            self.ledger.unwrap_or_default(),
            self.batch_pause,
        ))
    }
}

impl Default for ScenarioRunnerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
