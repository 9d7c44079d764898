// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Lifecycle Orchestrator
//!
//! Drives an instance through `absent -> launching -> rule-installed ->
//! registered` on provision and back to `absent` on deprovision.
//!
//! Provisioning is a saga: each step that touched external state has a
//! compensating action, and every failure path leaves the instance absent so
//! the platform can retry with the same id. The registry record is written
//! last, so a record exists only for a workload that was started.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::error::{Error, Result};
use crate::network::{ForwardingRule, NetworkRuleManager};
use crate::ports::DEFAULT_PORT;
use crate::registry::RegistryStore;
use crate::runtime::WorkloadRuntime;
use crate::types::{DeprovisionOutcome, ProvisionRequest, ServiceInstance};

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Service tag stored on every record.
    pub service_name: String,
    /// Info placeholder stored on every record.
    pub instance_info: String,
    /// Port handed to the first instance.
    pub default_port: u16,
    /// Port the database listens on inside the workload.
    pub internal_port: u16,
    /// Fail the provision when the forwarding rule cannot be installed.
    /// When false, the failure is logged and the instance is still recorded.
    pub require_forwarding_rule: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            service_name: "PostgreSQL".to_string(),
            instance_info: "default".to_string(),
            default_port: DEFAULT_PORT,
            internal_port: DEFAULT_PORT,
            require_forwarding_rule: true,
        }
    }
}

/// Coordinates the registry, the workload runtime, and the rule manager.
pub struct Orchestrator {
    registry: RegistryStore,
    runtime: Arc<dyn WorkloadRuntime>,
    network: Arc<dyn NetworkRuleManager>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create a new orchestrator.
    pub fn new(
        registry: RegistryStore,
        runtime: Arc<dyn WorkloadRuntime>,
        network: Arc<dyn NetworkRuleManager>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            registry,
            runtime,
            network,
            config,
        }
    }

    /// The registry this orchestrator writes to.
    pub fn registry(&self) -> &RegistryStore {
        &self.registry
    }

    /// The orchestrator configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Provision a new instance.
    ///
    /// Holds the registry write lock from port allocation to the insert, so
    /// concurrent provisions never observe the same maximum port. The lock
    /// spans the workload launch: a slow launch stalls every other provision
    /// and deprovision until it completes or the runtime's command timeout
    /// fires.
    ///
    /// Rules left on the allocated port by an earlier instance are removed
    /// before the new rule is installed.
    #[instrument(
        skip(self, request),
        fields(
            service_id = %request.service_id,
            plan_id = %request.plan_id,
            runtime = self.runtime.runtime_type(),
        )
    )]
    pub async fn provision(
        &self,
        instance_id: &str,
        request: &ProvisionRequest,
    ) -> Result<ServiceInstance> {
        let reservation = self.registry.reserve_port(self.config.default_port).await?;
        let port = reservation.port();

        if self.registry.get(instance_id).await?.is_some() {
            warn!(port, "Instance already registered");
            return Err(Error::AlreadyExists {
                instance_id: instance_id.to_string(),
            });
        }

        info!(port, "Launching workload");

        let handle = match self.runtime.start(instance_id).await {
            Ok(handle) => handle,
            Err(e) => {
                error!(port, error = %e, "Workload launch failed");
                self.stop_workload(instance_id).await;
                return Err(e.into());
            }
        };

        let rule = ForwardingRule {
            external_port: port,
            internal_address: handle.internal_address.clone(),
            internal_port: self.config.internal_port,
        };

        let rule_installed = match self.install_rule(&rule).await {
            Ok(()) => true,
            Err(e) if self.config.require_forwarding_rule => {
                error!(port, rule = %rule, error = %e, "Forwarding rule install failed");
                self.stop_workload(instance_id).await;
                return Err(e.into());
            }
            Err(e) => {
                warn!(
                    port,
                    rule = %rule,
                    error = %e,
                    "Forwarding rule install failed, continuing without it"
                );
                false
            }
        };

        let instance = match reservation
            .commit(
                instance_id,
                &self.config.service_name,
                &self.config.instance_info,
            )
            .await
        {
            Ok(instance) => instance,
            Err(e) => {
                error!(port, error = %e, "Registering instance failed");
                if rule_installed {
                    self.remove_rule(&rule).await;
                }
                self.stop_workload(instance_id).await;
                return Err(e);
            }
        };

        info!(
            port,
            internal_address = %handle.internal_address,
            started_at = %handle.started_at,
            "Instance provisioned"
        );

        Ok(instance)
    }

    /// Deprovision an instance.
    ///
    /// Unknown ids yield [`DeprovisionOutcome::Gone`]. A workload that cannot
    /// be stopped keeps its record and fails the call. Every rule forwarding
    /// the recorded port is removed, whether or not the workload was still
    /// running.
    #[instrument(skip(self), fields(runtime = self.runtime.runtime_type()))]
    pub async fn deprovision(&self, instance_id: &str) -> Result<DeprovisionOutcome> {
        let _guard = self.registry.exclusive().await;

        let record = self.registry.get(instance_id).await?;
        let port = record.as_ref().map(|r| r.port);

        if let Err(e) = self.runtime.stop(instance_id).await {
            error!(port, error = %e, "Stopping workload failed, keeping record");
            return Err(e.into());
        }

        if let Some(port) = port {
            self.remove_port_rules(port).await;
        }

        let rows = self.registry.delete(instance_id).await?;
        let outcome = DeprovisionOutcome::from_rows_affected(rows);

        match outcome {
            DeprovisionOutcome::Destroyed => info!(port, "Instance deprovisioned"),
            DeprovisionOutcome::Gone => info!("No record for instance"),
        }

        Ok(outcome)
    }

    /// Clear whatever still forwards the rule's port, then install the rule.
    async fn install_rule(&self, rule: &ForwardingRule) -> crate::network::Result<()> {
        let stale = self
            .network
            .remove_forwarding_rules_for_port(rule.external_port)
            .await?;
        if stale > 0 {
            warn!(port = rule.external_port, stale, "Removed stale forwarding rules");
        }
        self.network.add_forwarding_rule(rule).await
    }

    /// Best-effort workload teardown used by compensations.
    async fn stop_workload(&self, instance_id: &str) {
        if let Err(e) = self.runtime.stop(instance_id).await {
            warn!(instance_id = %instance_id, error = %e, "Compensating workload stop failed");
        }
    }

    /// Best-effort rule removal.
    async fn remove_rule(&self, rule: &ForwardingRule) {
        if let Err(e) = self.network.remove_forwarding_rule(rule).await {
            warn!(rule = %rule, error = %e, "Forwarding rule removal failed");
        }
    }

    /// Best-effort removal of every rule on `port`.
    async fn remove_port_rules(&self, port: u16) {
        match self.network.remove_forwarding_rules_for_port(port).await {
            Ok(removed) => info!(port, removed, "Forwarding rules removed"),
            Err(e) => warn!(port, error = %e, "Forwarding rule removal failed"),
        }
    }
}
