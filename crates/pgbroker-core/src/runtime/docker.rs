// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Docker workload runtime.
//!
//! Launches one `postgres` container per instance through the docker CLI,
//! named after the instance id, with ports published (`-P`). The container's
//! bridge address is read back with `docker inspect`.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::command::{CommandOutput, env_or, env_secs, run_command};
use crate::runtime::{Result, RuntimeError, WorkloadHandle, WorkloadRuntime};

/// Docker runtime configuration.
#[derive(Clone)]
pub struct DockerRuntimeConfig {
    /// Path or name of the docker CLI.
    pub docker_bin: String,
    /// Image to launch.
    pub image: String,
    /// `POSTGRES_USER` passed to every container.
    pub user: String,
    /// `POSTGRES_PASSWORD` passed to every container.
    pub password: String,
    /// Upper bound on waiting for the container to report an address.
    pub launch_timeout: Duration,
    /// Delay between `docker inspect` attempts.
    pub poll_interval: Duration,
    /// Upper bound on any single docker CLI call.
    pub command_timeout: Duration,
}

impl Default for DockerRuntimeConfig {
    fn default() -> Self {
        Self {
            docker_bin: "docker".to_string(),
            image: "postgres".to_string(),
            user: "postgres".to_string(),
            password: "mysecretpassword".to_string(),
            launch_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            command_timeout: Duration::from_secs(300),
        }
    }
}

impl fmt::Debug for DockerRuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DockerRuntimeConfig")
            .field("docker_bin", &self.docker_bin)
            .field("image", &self.image)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("launch_timeout", &self.launch_timeout)
            .field("poll_interval", &self.poll_interval)
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

impl DockerRuntimeConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            docker_bin: env_or("PGBROKER_DOCKER_BIN", &defaults.docker_bin),
            image: env_or("PGBROKER_POSTGRES_IMAGE", &defaults.image),
            user: env_or("PGBROKER_POSTGRES_USER", &defaults.user),
            password: env_or("PGBROKER_POSTGRES_PASSWORD", &defaults.password),
            launch_timeout: env_secs("PGBROKER_LAUNCH_TIMEOUT_SECS", defaults.launch_timeout),
            poll_interval: defaults.poll_interval,
            command_timeout: env_secs("PGBROKER_COMMAND_TIMEOUT_SECS", defaults.command_timeout),
        }
    }
}

/// Subset of `docker inspect` output needed to find the container address.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectEntry {
    #[serde(default)]
    network_settings: Option<NetworkSettings>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NetworkSettings {
    #[serde(rename = "IPAddress", default)]
    ip_address: Option<String>,
    #[serde(default)]
    networks: Option<BTreeMap<String, EndpointSettings>>,
}

#[derive(Debug, Deserialize)]
struct EndpointSettings {
    #[serde(rename = "IPAddress", default)]
    ip_address: Option<String>,
}

/// Extract the container address from `docker inspect` JSON.
///
/// Prefers the legacy top-level `IPAddress`, falling back to the first
/// attached network that reports one.
pub fn parse_inspect_address(json: &str) -> std::result::Result<Option<String>, serde_json::Error> {
    let entries: Vec<InspectEntry> = serde_json::from_str(json)?;

    let Some(settings) = entries.into_iter().next().and_then(|e| e.network_settings) else {
        return Ok(None);
    };

    let non_empty = |addr: Option<String>| addr.filter(|a| !a.is_empty());

    if let Some(address) = non_empty(settings.ip_address) {
        return Ok(Some(address));
    }

    Ok(settings
        .networks
        .unwrap_or_default()
        .into_values()
        .find_map(|endpoint| non_empty(endpoint.ip_address)))
}

/// Whether docker's stderr says the container does not exist.
fn is_missing_container(stderr: &str) -> bool {
    stderr.contains("No such container") || stderr.contains("No such object")
}

/// Workload runtime backed by the docker CLI.
pub struct DockerRuntime {
    config: DockerRuntimeConfig,
}

impl DockerRuntime {
    /// Create a new docker runtime.
    pub fn new(config: DockerRuntimeConfig) -> Self {
        Self { config }
    }

    /// Create a docker runtime configured from environment variables.
    pub fn from_env() -> Self {
        Self::new(DockerRuntimeConfig::from_env())
    }

    /// Arguments for `docker run` launching the workload of `instance_id`.
    pub fn run_args(&self, instance_id: &str) -> Vec<String> {
        vec![
            "run".to_string(),
            "--name".to_string(),
            instance_id.to_string(),
            "-e".to_string(),
            format!("POSTGRES_PASSWORD={}", self.config.password),
            "-e".to_string(),
            format!("POSTGRES_USER={}", self.config.user),
            "-P".to_string(),
            "-d".to_string(),
            self.config.image.clone(),
        ]
    }

    async fn docker(&self, args: &[String]) -> Result<CommandOutput> {
        Ok(run_command(&self.config.docker_bin, args, self.config.command_timeout).await?)
    }

    /// Run a docker subcommand on a container, treating "no such container"
    /// as success.
    async fn docker_on_container(&self, subcommand: &str, instance_id: &str) -> Result<()> {
        let output = self
            .docker(&[subcommand.to_string(), instance_id.to_string()])
            .await?;

        if output.success {
            return Ok(());
        }
        if is_missing_container(&output.stderr) {
            debug!(instance_id, subcommand, "Container already absent");
            return Ok(());
        }

        Err(RuntimeError::CommandFailed {
            operation: format!("docker {}", subcommand),
            exit_code: output.exit_code,
            stderr: output.stderr.trim().to_string(),
        })
    }

    async fn wait_for_address(&self, instance_id: &str) -> Result<String> {
        loop {
            if let Some(address) = self.internal_address(instance_id).await? {
                return Ok(address);
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

#[async_trait]
impl WorkloadRuntime for DockerRuntime {
    fn runtime_type(&self) -> &'static str {
        "docker"
    }

    async fn start(&self, instance_id: &str) -> Result<WorkloadHandle> {
        let started_at = Utc::now();
        let output = self.docker(&self.run_args(instance_id)).await?;
        if !output.success {
            return Err(RuntimeError::LaunchFailed {
                instance_id: instance_id.to_string(),
                reason: output.stderr.trim().to_string(),
            });
        }

        info!(
            instance_id,
            container_id = %output.stdout.trim(),
            image = %self.config.image,
            "Workload container started"
        );

        let timeout = self.config.launch_timeout;
        match tokio::time::timeout(timeout, self.wait_for_address(instance_id)).await {
            Ok(Ok(internal_address)) => {
                info!(
                    instance_id,
                    internal_address = %internal_address,
                    "Workload address discovered"
                );
                Ok(WorkloadHandle {
                    instance_id: instance_id.to_string(),
                    internal_address,
                    started_at,
                })
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!(
                    instance_id,
                    timeout_secs = timeout.as_secs(),
                    "Workload reported no address, removing it"
                );
                if let Err(e) = self.stop(instance_id).await {
                    warn!(instance_id, error = %e, "Failed to remove unaddressed workload");
                }
                Err(RuntimeError::AddressTimeout {
                    instance_id: instance_id.to_string(),
                    timeout,
                })
            }
        }
    }

    async fn stop(&self, instance_id: &str) -> Result<()> {
        self.docker_on_container("stop", instance_id).await?;
        self.docker_on_container("rm", instance_id).await?;
        info!(instance_id, "Workload container removed");
        Ok(())
    }

    async fn internal_address(&self, instance_id: &str) -> Result<Option<String>> {
        let output = self
            .docker(&["inspect".to_string(), instance_id.to_string()])
            .await?;

        if !output.success {
            if is_missing_container(&output.stderr) {
                return Ok(None);
            }
            return Err(RuntimeError::CommandFailed {
                operation: "docker inspect".to_string(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(parse_inspect_address(&output.stdout)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args() {
        let runtime = DockerRuntime::new(DockerRuntimeConfig::default());
        let args = runtime.run_args("41653aa4-3a3a-486a-4431-ef258b39f042");
        assert_eq!(
            args,
            vec![
                "run",
                "--name",
                "41653aa4-3a3a-486a-4431-ef258b39f042",
                "-e",
                "POSTGRES_PASSWORD=mysecretpassword",
                "-e",
                "POSTGRES_USER=postgres",
                "-P",
                "-d",
                "postgres",
            ]
        );
    }

    #[test]
    fn test_parse_legacy_ip_address() {
        let json =
            r#"[{"Id": "abc", "NetworkSettings": {"IPAddress": "172.17.0.2", "Networks": {}}}]"#;
        assert_eq!(
            parse_inspect_address(json).unwrap().as_deref(),
            Some("172.17.0.2")
        );
    }

    #[test]
    fn test_parse_network_ip_address() {
        let json = r#"[{"NetworkSettings": {"IPAddress": "", "Networks": {
            "bridge": {"IPAddress": ""},
            "custom": {"IPAddress": "10.0.0.7"}
        }}}]"#;
        assert_eq!(
            parse_inspect_address(json).unwrap().as_deref(),
            Some("10.0.0.7")
        );
    }

    #[test]
    fn test_parse_no_address_yet() {
        let json = r#"[{"NetworkSettings": {"IPAddress": "", "Networks": null}}]"#;
        assert_eq!(parse_inspect_address(json).unwrap(), None);
        assert_eq!(parse_inspect_address("[]").unwrap(), None);
        assert!(parse_inspect_address("not json").is_err());
    }

    #[test]
    fn test_config_debug_redacts_password() {
        let rendered = format!("{:?}", DockerRuntimeConfig::default());
        assert!(!rendered.contains("mysecretpassword"));
        assert!(rendered.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_launch_failure_from_cli() {
        // `false` exits non-zero for any arguments, standing in for a failing docker.
        let runtime = DockerRuntime::new(DockerRuntimeConfig {
            docker_bin: "false".to_string(),
            ..DockerRuntimeConfig::default()
        });
        let err = runtime.start("some-instance").await.unwrap_err();
        assert!(matches!(err, RuntimeError::LaunchFailed { .. }));
    }
}
