//! Application setup: create-if-absent and wait for running instances

use crate::config::{TestConfiguration, WorkloadConfig};
use crate::error::{LoadTestError, LoadTestResult};
use crate::poller::{PollPolicy, Poller};
use crate::resource::{
    now_micros, Application, ApplicationSpec, Container, ContainerPort, EnvVar,
    IdleSessionNumThreshold, ObjectMeta, ResourceRequirements, ScalingPolicy,
    IDLE_SESSION_NUMBER_POLICY,
};
use crate::traits::ResourceGateway;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Environment variable telling the session wrapper how to open a session
pub const OPEN_SESSION_CMD_ENV: &str = "SESSION_WRAPPER_OPEN_SESSION_CMD";

/// Result of [`ApplicationDriver::ensure_application`]
#[derive(Debug, Clone)]
pub struct ApplicationSetup {
    /// The application as returned by the control plane
    pub application: Application,
    /// Whether this call created it
    pub created: bool,
}

/// How long an application took to reach its target instance count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupReport {
    /// Application name
    pub application: String,
    /// Running instances when the target was observed
    pub running_instances: u32,
    /// Creation to observation, microseconds
    pub elapsed_micros: i64,
}

/// Creates applications and waits for their instances
pub struct ApplicationDriver {
    gateway: Arc<dyn ResourceGateway>,
    workload: WorkloadConfig,
    setup_policy: PollPolicy,
}

impl ApplicationDriver {
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
        }
    }

    /// Application payload for `test`: the configured workload plus an
    /// idle-session scaling policy with zero watermarks
    pub fn application_spec(&self, test: &TestConfiguration) -> ApplicationSpec {
        let workload = &self.workload;
        let quantities: BTreeMap<String, String> = [
            ("memory".to_string(), workload.memory_bytes.to_string()),
            ("cpu".to_string(), format!("{}m", workload.cpu_millis)),
        ]
        .into_iter()
        .collect();

        ApplicationSpec {
            containers: vec![Container {
                name: workload.container_name.clone(),
                image: workload.image.clone(),
                ports: vec![ContainerPort {
                    name: workload.container_name.clone(),
                    container_port: workload.container_port,
                }],
                env: vec![EnvVar {
                    name: OPEN_SESSION_CMD_ENV.to_string(),
                    value: workload.open_session_cmd.clone(),
                }],
                resources: ResourceRequirements {
                    limits: quantities.clone(),
                    requests: quantities,
                },
            }],
            config_data: BTreeMap::new(),
            scaling_policy: ScalingPolicy {
                minimum_instance: test.num_of_init_pods_per_app,
                maximum_instance: workload.maximum_instance,
                burst: test.burst_of_pod_per_app,
                scaling_policy_type: IDLE_SESSION_NUMBER_POLICY.to_string(),
                idle_session_num_threshold: Some(IdleSessionNumThreshold {
                    high_water_mark: 0,
                    low_water_mark: 0,
                }),
            },
        }
    }

    /// Return the application, creating it if it does not exist
    ///
    /// A new application carries the creation-time label in microseconds.
    pub async fn ensure_application(
        &self,
        namespace: &str,
        name: &str,
        test: &TestConfiguration,
    ) -> LoadTestResult<ApplicationSetup> {
        let existing = self
            .gateway
            .get_application(namespace, name)
            .await
            .map_err(|e| LoadTestError::gateway("get application", &e))?;

        if let Some(application) = existing {
            tracing::info!(namespace, application = name, "Application already exists");
            return Ok(ApplicationSetup {
                application,
                created: false,
            });
        }

        let metadata = ObjectMeta::new(namespace, name).with_creation_micros(now_micros());
        let request = Application::new(metadata, self.application_spec(test));
        let application = self
            .gateway
            .create_application(&request)
            .await
            .map_err(|e| LoadTestError::gateway("create application", &e))?;

        tracing::info!(
            namespace,
            application = name,
            initial_instances = test.num_of_init_pods_per_app,
            burst = test.burst_of_pod_per_app,
            "Application created"
        );

        Ok(ApplicationSetup {
            application,
            created: true,
        })
    }

    /// Wait until the application runs at least `target_instances`
    ///
    /// Returns immediately with `None` when the target is 0, and fails if the
    /// application reads as not found mid-wait. Elapsed time is
    /// measured from the application's creation time (microsecond label
    /// preferred) to the moment the target was observed.
    pub async fn await_running(
        &self,
        namespace: &str,
        name: &str,
        target_instances: u32,
    ) -> LoadTestResult<Option<SetupReport>> {
        if target_instances == 0 {
            return Ok(None);
        }

        tracing::info!(
            namespace,
            application = name,
            target_instances,
            "Waiting for application instances"
        );

        let wait_started = now_micros();
        let mut poller = Poller::new(format!("application {namespace}/{name}"), self.setup_policy);
        let gateway = self.gateway.as_ref();
        let snapshot = poller
            .wait_for(
                || gateway.get_application(namespace, name),
                |app| app.map_or(true, |a| a.status.running_instances >= target_instances),
            )
            .await?;

        let observed_at = now_micros();
        let Some(application) = snapshot else {
            return Err(LoadTestError::orchestration(format!(
                "application {namespace}/{name} disappeared while waiting for setup"
            )));
        };
        let created_at = application
            .metadata
            .creation_unix_micro()
            .unwrap_or(wait_started);

        let report = SetupReport {
            application: name.to_string(),
            running_instances: application.status.running_instances,
            elapsed_micros: (observed_at - created_at).max(0),
        };

        tracing::info!(
            application = name,
            elapsed_micros = report.elapsed_micros,
            running_instances = report.running_instances,
            polls = poller.attempts(),
            "Application setup complete"
        );

        Ok(Some(report))
    }
}

impl std::fmt::Debug for ApplicationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationDriver")
            .field("gateway", &self.gateway.name())
            .field("setup_policy", &self.setup_policy)
            .finish()
    }
}
