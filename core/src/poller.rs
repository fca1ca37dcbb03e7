//! Fixed-interval status polling
//!
//! Every wait in the harness is a sleep-then-read loop: sleep one interval,
//! read the resource, test a condition. Read errors other than "not found"
//! are logged and retried on the next interval. Each loop runs under a
//! [`PollPolicy`] whose deadline or attempt cap turns a stuck wait into a
//! [`PollTimeout`].

use crate::traits::GatewayError;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Interval and budget for one polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Sleep before every read
    pub interval: Duration,

    /// Give up once this much time has passed
    pub deadline: Option<Duration>,

    /// Give up after this many reads
    pub max_attempts: Option<usize>,
}

impl PollPolicy {
    /// Policy with the given interval and no budget
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
            max_attempts: None,
        }
    }

    /// Set the deadline
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set the attempt cap
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Whether this policy can wait forever
    pub fn is_unbounded(&self) -> bool {
        self.deadline.is_none() && self.max_attempts.is_none()
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(200))
    }
}

/// A polling loop ran out of budget before its condition held
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("timed out waiting for {what} after {attempts} polls ({elapsed:?})")]
pub struct PollTimeout {
    /// What was being waited on
    pub what: String,
    /// Reads performed
    pub attempts: usize,
    /// Time spent
    pub elapsed: Duration,
}

/// Stateful polling loop
///
/// Use [`Poller::wait_for`] for the single-resource case, or drive
/// [`Poller::tick`] by hand when one iteration touches many resources.
#[derive(Debug)]
pub struct Poller {
    what: String,
    policy: PollPolicy,
    started_at: Instant,
    attempts: usize,
}

impl Poller {
    /// Start a loop; the deadline clock starts now
    pub fn new(what: impl Into<String>, policy: PollPolicy) -> Self {
        Self {
            what: what.into(),
            policy,
            started_at: Instant::now(),
            attempts: 0,
        }
    }

    /// Number of completed intervals
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Time since the loop started
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Sleep one interval, or fail if the budget is spent
    pub async fn tick(&mut self) -> Result<(), PollTimeout> {
        if let Some(max) = self.policy.max_attempts {
            if self.attempts >= max {
                return Err(self.timeout());
            }
        }
        if let Some(deadline) = self.policy.deadline {
            if self.elapsed() >= deadline {
                return Err(self.timeout());
            }
        }

        tokio::time::sleep(self.policy.interval).await;
        self.attempts += 1;
        Ok(())
    }

    /// Poll `read` until `satisfied` accepts the snapshot
    ///
    /// `None` means the resource was not found and is passed to `satisfied`
    /// like any other snapshot. Read errors are swallowed and retried.
    /// Returns the snapshot that satisfied the condition.
    pub async fn wait_for<T, F, Fut, P>(
        &mut self,
        mut read: F,
        mut satisfied: P,
    ) -> Result<Option<T>, PollTimeout>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, GatewayError>>,
        P: FnMut(Option<&T>) -> bool,
    {
        loop {
            self.tick().await?;

            match read().await {
                Ok(snapshot) => {
                    if satisfied(snapshot.as_ref()) {
                        return Ok(snapshot);
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        what = %self.what,
                        attempt = self.attempts,
                        error = %e,
                        "Read failed, retrying next interval"
                    );
                }
            }
        }
    }

    fn timeout(&self) -> PollTimeout {
        PollTimeout {
            what: self.what.clone(),
            attempts: self.attempts,
            elapsed: self.elapsed(),
        }
    }
}
