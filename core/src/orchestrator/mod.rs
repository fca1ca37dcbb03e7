//! Scenario runner for load-test lifecycle management
//!
//! The ScenarioRunner coordinates a complete load test:
//! - Running `num_of_test_cycles` cycles back to back
//! - Spawning one task per application within a cycle
//! - Managing graceful shutdown via a broadcast channel
//! - Summarizing each cycle and the whole run
//!
//! # Example
//!
//! ```ignore
//! use fornax_loadtest_core::{ScenarioRunnerBuilder, Scenario};
//!
//! let mut runner = ScenarioRunnerBuilder::new()
//!     .config(LoadTestConfig::default().with_scenario(Scenario::SessionFullCycle))
//!     .gateway(gateway)
//!     .build()?;
//!
//! let report = runner.run_with_signal_handling().await?;
//! ```

mod builder;
mod executor;
mod report;

pub use builder::ScenarioRunnerBuilder;
pub use executor::ScenarioRunner;
pub use report::{AppReport, CycleReport, RunReport};
