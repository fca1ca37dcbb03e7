//! Config file loading
//!
//! Loads a TOML file, applies `FORNAX_LOADTEST_*` environment overrides and
//! validates the result.

use anyhow::{Context, Result};
use fornax_loadtest_core::{LoadTestConfig, PollingConfig, TestConfiguration, WorkloadConfig};
use fornax_loadtest_gateways::GatewayConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Overrides `[gateway] base_url`
pub const ENV_GATEWAY_BASE_URL: &str = "FORNAX_LOADTEST_GATEWAY_BASE_URL";
/// Overrides `[gateway] token`
pub const ENV_GATEWAY_TOKEN: &str = "FORNAX_LOADTEST_GATEWAY_TOKEN";
/// Overrides `[gateway] timeout_secs`
pub const ENV_GATEWAY_TIMEOUT_SECS: &str = "FORNAX_LOADTEST_GATEWAY_TIMEOUT_SECS";
/// Overrides `[test] namespace`
pub const ENV_NAMESPACE: &str = "FORNAX_LOADTEST_NAMESPACE";

/// On-disk config: the load-test sections plus `[gateway]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub test: TestConfiguration,
    pub polling: PollingConfig,
    pub workload: WorkloadConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<f64>,
    pub gateway: GatewayConfig,
}

impl FileConfig {
    /// Read, override from the environment, then validate
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Read and parse without overrides or validation
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Parse a TOML string
    pub fn parse(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Apply `FORNAX_LOADTEST_*` variables from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        override_string(&mut self.gateway.base_url, ENV_GATEWAY_BASE_URL, &lookup);
        override_u64(&mut self.gateway.timeout_secs, ENV_GATEWAY_TIMEOUT_SECS, &lookup);
        override_string(&mut self.test.namespace, ENV_NAMESPACE, &lookup);
        if let Some(token) = lookup(ENV_GATEWAY_TOKEN) {
            self.gateway.token = if token.is_empty() { None } else { Some(token) };
        }
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.load_test().validate()?;
        self.gateway.validate()?;
        Ok(())
    }

    /// The sections the scenario runner consumes
    pub fn load_test(&self) -> LoadTestConfig {
        LoadTestConfig {
            test: self.test.clone(),
            polling: self.polling.clone(),
            workload: self.workload.clone(),
            rate_limit: self.rate_limit,
        }
    }
}

fn override_string(target: &mut String, env_key: &str, lookup: &impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup(env_key) {
        *target = val;
    }
}

fn override_u64(target: &mut u64, env_key: &str, lookup: &impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fornax_loadtest_core::Scenario;
    use fornax_loadtest_gateways::GatewayKind;
    use std::collections::HashMap;
    use std::io::Write;

    const SAMPLE: &str = r#"
rate_limit = 50.0

[test]
scenario = "session_full_cycle"
num_of_apps = 4
num_of_session_per_app = 100

[polling]
session_setup_interval_ms = 100
timeout_secs = 120

[gateway]
kind = "simulated"

[gateway.simulated]
session_startup_ms = 50
"#;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_sample() {
        let config = FileConfig::parse(SAMPLE).unwrap();

        assert_eq!(config.test.scenario, Scenario::SessionFullCycle);
        assert_eq!(config.test.num_of_apps, 4);
        assert_eq!(config.test.num_of_init_pods_per_app, 1);
        assert_eq!(config.polling.session_setup_interval_ms, 100);
        assert_eq!(config.polling.app_setup_interval_ms, 200);
        assert_eq!(config.rate_limit, Some(50.0));
        assert_eq!(config.gateway.kind, GatewayKind::Simulated);
        assert_eq!(config.gateway.simulated.session_startup_ms, 50);
        assert_eq!(config.gateway.simulated.teardown_ms, 500);

        let load_test = config.load_test();
        assert_eq!(load_test.test, config.test);
        assert_eq!(load_test.rate_limit, Some(50.0));
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = FileConfig::parse("").unwrap();
        assert_eq!(config, FileConfig::default());
        config.validate().unwrap();
    }

    #[test]
    fn test_unknown_scenario_rejected() {
        let err = FileConfig::parse("[test]\nscenario = \"burst\"\n").unwrap_err();
        assert!(err.to_string().contains("burst") || err.to_string().contains("variant"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = FileConfig::default();
        config.apply_overrides_from(lookup(&[
            (ENV_GATEWAY_BASE_URL, "https://fornax.example:6443"),
            (ENV_GATEWAY_TOKEN, "secret"),
            (ENV_GATEWAY_TIMEOUT_SECS, "5"),
            (ENV_NAMESPACE, "perf"),
        ]));

        assert_eq!(config.gateway.base_url, "https://fornax.example:6443");
        assert_eq!(config.gateway.token.as_deref(), Some("secret"));
        assert_eq!(config.gateway.timeout_secs, 5);
        assert_eq!(config.test.namespace, "perf");
    }

    #[test]
    fn test_unparsable_override_is_ignored() {
        let mut config = FileConfig::default();
        config.apply_overrides_from(lookup(&[(ENV_GATEWAY_TIMEOUT_SECS, "soon")]));
        assert_eq!(config.gateway.timeout_secs, 30);
    }

    #[test]
    fn test_empty_token_clears() {
        let mut config = FileConfig::default();
        config.gateway.token = Some("old".into());
        config.apply_overrides_from(lookup(&[(ENV_GATEWAY_TOKEN, "")]));
        assert!(config.gateway.token.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_sections() {
        let mut config = FileConfig::default();
        config.test.num_of_apps = 0;
        assert!(config.validate().is_err());

        let mut config = FileConfig::default();
        config.gateway.base_url = "fornax:8001".into();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = FileConfig::load(file.path()).await.unwrap();
        assert_eq!(config.test.num_of_session_per_app, 100);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileConfig::load(dir.path().join("absent.toml"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }
}
