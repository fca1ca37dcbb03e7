//! In-memory control plane
//!
//! Applications start `minimumInstance` instances after the configured
//! startup latency. Each available session occupies one instance; the
//! simulated autoscaler adds instances as sessions need them. Deleted
//! resources stay visible for the teardown latency and then read as not
//! found. Time is tokio time, so paused-clock tests run instantly.

use crate::config::SimulatedConfig;

use async_trait::async_trait;
use fornax_loadtest_core::{
    now_micros, Application, ApplicationSession, GatewayError, ResourceGateway, SessionStatus,
};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct SimApplication {
    application: Application,
    created_at: Instant,
    deleted_at: Option<Instant>,
}

struct SimSession {
    session: ApplicationSession,
    created_at: Instant,
    created_micro: i64,
    times_out: bool,
    deleted_at: Option<Instant>,
}

#[derive(Default)]
struct SimState {
    applications: HashMap<String, SimApplication>,
    sessions: HashMap<String, SimSession>,
    session_creates: usize,
}

/// Fake control plane for `--simulate` runs and end-to-end tests
pub struct SimulatedGateway {
    config: SimulatedConfig,
    state: Mutex<SimState>,
}

impl SimulatedGateway {
    /// Create an empty control plane
    pub fn new(config: SimulatedConfig) -> Self {
        Self {
            config,
            state: Mutex::new(SimState::default()),
        }
    }

    fn instance_startup(&self) -> Duration {
        Duration::from_millis(self.config.instance_startup_ms)
    }

    fn session_startup(&self) -> Duration {
        Duration::from_millis(self.config.session_startup_ms)
    }

    fn teardown(&self) -> Duration {
        Duration::from_millis(self.config.teardown_ms)
    }

    fn gone(&self, deleted_at: Option<Instant>, now: Instant) -> bool {
        deleted_at.is_some_and(|at| now >= at + self.teardown())
    }

    /// Number of applications that still read as present
    pub async fn application_count(&self) -> usize {
        let now = Instant::now();
        let state = self.state.lock().await;
        state
            .applications
            .values()
            .filter(|a| !self.gone(a.deleted_at, now))
            .count()
    }

    /// Number of sessions that still read as present
    pub async fn session_count(&self) -> usize {
        let now = Instant::now();
        let state = self.state.lock().await;
        state
            .sessions
            .values()
            .filter(|s| !self.gone(s.deleted_at, now))
            .count()
    }

    /// Session status at `now`
    fn session_status(&self, session: &SimSession, now: Instant) -> (SessionStatus, i64) {
        if session.deleted_at.is_some() {
            return (SessionStatus::Closing, 0);
        }
        if now < session.created_at + self.session_startup() {
            return (SessionStatus::Pending, 0);
        }
        if session.times_out {
            return (SessionStatus::Timeout, 0);
        }
        let startup_micros = i64::try_from(self.session_startup().as_micros()).unwrap_or(i64::MAX);
        (
            SessionStatus::Available,
            session.created_micro.saturating_add(startup_micros),
        )
    }

    /// Sessions of `application` holding an instance at `now`
    fn busy_instances(&self, state: &SimState, key_prefix: &str, name: &str, now: Instant) -> u32 {
        let busy = state
            .sessions
            .iter()
            .filter(|(key, s)| key.starts_with(key_prefix) && s.session.spec.application_name == name)
            .filter(|(_, s)| !self.gone(s.deleted_at, now))
            .filter(|(_, s)| {
                s.deleted_at.is_some()
                    || self.session_status(s, now).0 == SessionStatus::Available
            })
            .count();
        u32::try_from(busy).unwrap_or(u32::MAX)
    }
}

#[async_trait]
impl ResourceGateway for SimulatedGateway {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn create_application(
        &self,
        application: &Application,
    ) -> Result<Application, GatewayError> {
        let now = Instant::now();
        let key = application.metadata.key();
        let mut state = self.state.lock().await;

        if let Some(existing) = state.applications.get(&key) {
            if !self.gone(existing.deleted_at, now) {
                return Err(GatewayError::AlreadyExists {
                    resource: format!("applications/{key}"),
                });
            }
        }

        let mut created = application.clone();
        created.status = Default::default();
        state.applications.insert(
            key,
            SimApplication {
                application: created.clone(),
                created_at: now,
                deleted_at: None,
            },
        );
        Ok(created)
    }

    async fn get_application(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Application>, GatewayError> {
        let now = Instant::now();
        let key = format!("{namespace}/{name}");
        let mut state = self.state.lock().await;

        let Some(entry) = state.applications.get(&key) else {
            return Ok(None);
        };
        if self.gone(entry.deleted_at, now) {
            state.applications.remove(&key);
            return Ok(None);
        }

        let started = now >= entry.created_at + self.instance_startup();
        let deleting = entry.deleted_at.is_some();
        let minimum = entry.application.spec.scaling_policy.minimum_instance;
        let mut application = entry.application.clone();

        let busy = self.busy_instances(&state, &format!("{namespace}/"), name, now);
        let running = match (deleting, started) {
            (true, _) => busy,
            (false, true) => minimum.max(busy),
            (false, false) => busy,
        };
        application.status.total_instances = running;
        application.status.running_instances = running;
        application.status.idle_instances = running - busy.min(running);

        Ok(Some(application))
    }

    async fn delete_application(&self, namespace: &str, name: &str) -> Result<(), GatewayError> {
        let now = Instant::now();
        let key = format!("{namespace}/{name}");
        let mut state = self.state.lock().await;

        match state.applications.get_mut(&key) {
            Some(entry) if entry.deleted_at.is_none() => {
                entry.deleted_at = Some(now);
                Ok(())
            }
            _ => Err(GatewayError::not_found(format!("applications/{key}"))),
        }
    }

    async fn create_session(
        &self,
        session: &ApplicationSession,
    ) -> Result<ApplicationSession, GatewayError> {
        let now = Instant::now();
        let key = session.metadata.key();
        let mut state = self.state.lock().await;

        state.session_creates += 1;
        let ordinal = state.session_creates;
        if self
            .config
            .fail_create_every
            .is_some_and(|n| n > 0 && ordinal % n == 0)
        {
            return Err(GatewayError::Status {
                status: 503,
                message: "simulated create rejection".into(),
            });
        }
        if state.sessions.contains_key(&key) {
            return Err(GatewayError::AlreadyExists {
                resource: format!("applicationsessions/{key}"),
            });
        }

        let mut created = session.clone();
        created.status.session_status = SessionStatus::Pending;
        created.status.available_time_micro = 0;
        state.sessions.insert(
            key,
            SimSession {
                session: created.clone(),
                created_at: now,
                created_micro: now_micros(),
                times_out: self
                    .config
                    .timeout_every
                    .is_some_and(|n| n > 0 && ordinal % n == 0),
                deleted_at: None,
            },
        );
        Ok(created)
    }

    async fn get_session(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ApplicationSession>, GatewayError> {
        let now = Instant::now();
        let key = format!("{namespace}/{name}");
        let mut state = self.state.lock().await;

        let Some(entry) = state.sessions.get(&key) else {
            return Ok(None);
        };
        if self.gone(entry.deleted_at, now) {
            state.sessions.remove(&key);
            return Ok(None);
        }

        let (status, available_time_micro) = self.session_status(entry, now);
        let mut session = entry.session.clone();
        session.status.session_status = status;
        session.status.available_time_micro = available_time_micro;
        Ok(Some(session))
    }

    async fn delete_session(&self, namespace: &str, name: &str) -> Result<(), GatewayError> {
        let now = Instant::now();
        let key = format!("{namespace}/{name}");
        let mut state = self.state.lock().await;

        match state.sessions.get_mut(&key) {
            Some(entry) if entry.deleted_at.is_none() => {
                entry.deleted_at = Some(now);
                Ok(())
            }
            _ => Err(GatewayError::not_found(format!(
                "applicationsessions/{key}"
            ))),
        }
    }
}

impl std::fmt::Debug for SimulatedGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedGateway")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fornax_loadtest_core::{ApplicationSpec, ObjectMeta, SessionSpec};

    const NS: &str = "fornaxtest";

    fn gateway() -> SimulatedGateway {
        SimulatedGateway::new(SimulatedConfig {
            instance_startup_ms: 1000,
            session_startup_ms: 300,
            teardown_ms: 500,
            ..Default::default()
        })
    }

    fn app(name: &str, minimum: u32) -> Application {
        let mut spec = ApplicationSpec::default();
        spec.scaling_policy.minimum_instance = minimum;
        Application::new(ObjectMeta::new(NS, name), spec)
    }

    fn session(name: &str, app: &str) -> ApplicationSession {
        ApplicationSession::new(
            ObjectMeta::new(NS, name),
            SessionSpec {
                application_name: app.into(),
                ..Default::default()
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_instances_start_after_latency() {
        let gw = gateway();
        gw.create_application(&app("echo", 3)).await.unwrap();

        let before = gw.get_application(NS, "echo").await.unwrap().unwrap();
        assert_eq!(before.status.running_instances, 0);

        tokio::time::advance(Duration::from_millis(1000)).await;
        let after = gw.get_application(NS, "echo").await.unwrap().unwrap();
        assert_eq!(after.status.running_instances, 3);
        assert_eq!(after.status.idle_instances, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_application_rejected() {
        let gw = gateway();
        gw.create_application(&app("echo", 1)).await.unwrap();
        let err = gw.create_application(&app("echo", 1)).await.unwrap_err();
        assert!(matches!(err, GatewayError::AlreadyExists { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_becomes_available_and_occupies_instance() {
        let gw = gateway();
        gw.create_application(&app("echo", 1)).await.unwrap();
        tokio::time::advance(Duration::from_millis(1000)).await;
        gw.create_session(&session("s-0", "echo")).await.unwrap();
        gw.create_session(&session("s-1", "echo")).await.unwrap();

        let pending = gw.get_session(NS, "s-0").await.unwrap().unwrap();
        assert_eq!(pending.status.session_status, SessionStatus::Pending);

        tokio::time::advance(Duration::from_millis(300)).await;
        let available = gw.get_session(NS, "s-0").await.unwrap().unwrap();
        assert_eq!(available.status.session_status, SessionStatus::Available);
        assert!(available.status.available_time_micro > 0);

        let app = gw.get_application(NS, "echo").await.unwrap().unwrap();
        assert_eq!(app.status.running_instances, 2);
        assert_eq!(app.status.idle_instances, 0);
        assert_eq!(app.active_instances(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleted_session_releases_instance_after_teardown() {
        let gw = gateway();
        gw.create_application(&app("echo", 1)).await.unwrap();
        gw.create_session(&session("s-0", "echo")).await.unwrap();
        tokio::time::advance(Duration::from_millis(1000)).await;

        gw.delete_session(NS, "s-0").await.unwrap();
        let closing = gw.get_session(NS, "s-0").await.unwrap().unwrap();
        assert_eq!(closing.status.session_status, SessionStatus::Closing);
        assert_eq!(
            gw.get_application(NS, "echo").await.unwrap().unwrap().active_instances(),
            1
        );

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(gw.get_session(NS, "s-0").await.unwrap().is_none());
        assert_eq!(
            gw.get_application(NS, "echo").await.unwrap().unwrap().active_instances(),
            0
        );
        assert!(gw.delete_session(NS, "s-0").await.unwrap_err().is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleted_application_disappears() {
        let gw = gateway();
        gw.create_application(&app("echo", 1)).await.unwrap();
        gw.delete_application(NS, "echo").await.unwrap();
        assert!(gw.get_application(NS, "echo").await.unwrap().is_some());
        assert!(gw.delete_application(NS, "echo").await.unwrap_err().is_not_found());

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(gw.get_application(NS, "echo").await.unwrap().is_none());
        assert_eq!(gw.application_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fault_injection() {
        let gw = SimulatedGateway::new(SimulatedConfig {
            session_startup_ms: 100,
            timeout_every: Some(2),
            fail_create_every: Some(3),
            ..Default::default()
        });

        assert!(gw.create_session(&session("s-1", "echo")).await.is_ok());
        assert!(gw.create_session(&session("s-2", "echo")).await.is_ok());
        let err = gw.create_session(&session("s-3", "echo")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Status { status: 503, .. }));

        tokio::time::advance(Duration::from_millis(100)).await;
        let first = gw.get_session(NS, "s-1").await.unwrap().unwrap();
        let second = gw.get_session(NS, "s-2").await.unwrap().unwrap();
        assert_eq!(first.status.session_status, SessionStatus::Available);
        assert_eq!(second.status.session_status, SessionStatus::Timeout);
        assert_eq!(gw.session_count().await, 2);
    }
}
