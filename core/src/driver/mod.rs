//! Lifecycle drivers
//!
//! Each driver owns one phase of a test cycle and reaches the control plane
//! only through a shared [`ResourceGateway`](crate::traits::ResourceGateway):
//!
//! 1. [`ApplicationDriver`] creates the application if absent and waits for
//!    its initial instances to run
//! 2. [`SessionBatchDriver`] creates a cohort of sessions in five staggered
//!    bursts, waits for each to settle, and appends the cohort to the
//!    run's [`SessionLedger`](crate::ledger::SessionLedger)
//! 3. [`TeardownDriver`] deletes the application or the cohort's sessions
//!    and waits for the control plane to drain
//!
//! Every wait is a sleep-then-read loop under a
//! [`PollPolicy`](crate::poller::PollPolicy).
//!
//! # Example
//!
//! ```ignore
//! use fornax_loadtest_core::driver::{ApplicationDriver, SessionBatchDriver};
//!
//! let apps = ApplicationDriver::new(gateway.clone(), workload.clone(), polling.app_setup());
//! let setup = apps.ensure_application("fornaxtest", "echoserver-0", &test).await?;
//! apps.await_running("fornaxtest", "echoserver-0", test.num_of_init_pods_per_app).await?;
//!
//! let sessions = SessionBatchDriver::new(gateway, workload, polling.session_setup());
//! let outcome = sessions.create_cohort(&setup.application, &test, &ledger).await;
//! println!("{} sessions settled", outcome.sessions.len());
//! ```

mod application;
mod cohort;
mod rate_limiter;
mod stagger;
mod teardown;

pub use application::{ApplicationDriver, ApplicationSetup, SetupReport, OPEN_SESSION_CMD_ENV};
pub use cohort::{session_name, CohortOutcome, SessionBatchDriver};
pub use rate_limiter::CreateRateLimiter;
pub use stagger::{BatchStagger, BURSTS_PER_COHORT, DEFAULT_BATCH_PAUSE};
pub use teardown::{DeleteFailure, SessionTeardownReport, TeardownDriver, TeardownReport};
